// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Well-formedness checks of produced documents.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;

/// Severity of a problem found in a document.  Warnings are never reported.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A recoverable problem: the rest of the document was still inspected.
    Error,

    /// An unrecoverable problem: inspection stopped here.
    Fatal,
}

/// A problem found in a document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct XmlDiagnostic {
    /// Severity of the problem.
    pub severity: Severity,

    /// Description of the problem.
    pub message: String,

    /// 1-based line where the problem was detected.
    pub line: usize,
}

impl XmlDiagnostic {
    /// Creates a new diagnostic.
    fn new<S: Into<String>>(severity: Severity, message: S, line: usize) -> Self {
        Self { severity, message: message.into(), line }
    }
}

/// Computes the 1-based line of the byte at `pos` in `xml`.
fn line_at(xml: &str, pos: usize) -> usize {
    let pos = pos.min(xml.len());
    xml.as_bytes()[..pos].iter().filter(|b| **b == b'\n').count() + 1
}

/// Records an error in `diagnostics` for every attribute of `element` that cannot be parsed.
fn check_attributes(element: &BytesStart<'_>, line: usize, diagnostics: &mut Vec<XmlDiagnostic>) {
    for attr in element.attributes() {
        let result =
            attr.map_err(quick_xml::Error::from).and_then(|a| a.unescape_value().map(|_| ()));
        if let Err(e) = result {
            diagnostics.push(XmlDiagnostic::new(
                Severity::Error,
                format!("Malformed attribute: {}", e),
                line,
            ));
        }
    }
}

/// Checks that `xml` is a well-formed document and returns all problems found.
///
/// Inspection stops at the first fatal problem, which is always the last one in the list.
pub fn validate_xml(xml: &str) -> Vec<XmlDiagnostic> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut diagnostics = vec![];
    let mut open: Vec<String> = vec![];
    let mut seen_root = false;
    loop {
        let event = reader.read_event();
        let line = line_at(xml, reader.buffer_position());
        match event {
            Ok(Event::Start(e)) => {
                if seen_root && open.is_empty() {
                    diagnostics.push(XmlDiagnostic::new(
                        Severity::Fatal,
                        "Extra content at the end of the document",
                        line,
                    ));
                    break;
                }
                seen_root = true;
                check_attributes(&e, line, &mut diagnostics);
                open.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }

            Ok(Event::Empty(e)) => {
                if seen_root && open.is_empty() {
                    diagnostics.push(XmlDiagnostic::new(
                        Severity::Fatal,
                        "Extra content at the end of the document",
                        line,
                    ));
                    break;
                }
                seen_root = true;
                check_attributes(&e, line, &mut diagnostics);
            }

            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match open.pop() {
                    Some(expected) if expected == name => (),
                    Some(expected) => {
                        diagnostics.push(XmlDiagnostic::new(
                            Severity::Fatal,
                            format!(
                                "Opening and ending tag mismatch: {} and {}",
                                expected, name
                            ),
                            line,
                        ));
                        break;
                    }
                    None => {
                        diagnostics.push(XmlDiagnostic::new(
                            Severity::Fatal,
                            format!("Unexpected end tag: {}", name),
                            line,
                        ));
                        break;
                    }
                }
            }

            Ok(Event::Text(t)) => {
                if open.is_empty() {
                    let message = if seen_root {
                        "Extra content at the end of the document"
                    } else {
                        "Start tag expected, '<' not found"
                    };
                    diagnostics.push(XmlDiagnostic::new(Severity::Fatal, message, line));
                    break;
                }
                if let Err(err) = t.unescape() {
                    diagnostics.push(XmlDiagnostic::new(
                        Severity::Error,
                        format!("Bad entity reference: {}", err),
                        line,
                    ));
                }
            }

            Ok(Event::CData(_)) => {
                if open.is_empty() {
                    diagnostics.push(XmlDiagnostic::new(
                        Severity::Fatal,
                        "CDATA section outside of the root element",
                        line,
                    ));
                    break;
                }
            }

            Ok(Event::Eof) => {
                if let Some(name) = open.last() {
                    diagnostics.push(XmlDiagnostic::new(
                        Severity::Fatal,
                        format!("Premature end of data in tag {}", name),
                        line,
                    ));
                } else if !seen_root {
                    diagnostics.push(XmlDiagnostic::new(
                        Severity::Fatal,
                        "Document is empty",
                        line,
                    ));
                }
                break;
            }

            Ok(Event::Comment(_) | Event::Decl(_) | Event::DocType(_) | Event::PI(_)) => (),

            Err(e) => {
                diagnostics.push(XmlDiagnostic::new(Severity::Fatal, e.to_string(), line));
                break;
            }
        }
    }
    diagnostics
}
