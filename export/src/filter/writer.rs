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

//! Thin wrapper over the `quick-xml` writer to emit indented documents.

use crate::filter::{FilterError, FilterResult};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Incremental builder of an indented XML document with a UTF-8 declaration.
pub(crate) struct XmlBuilder {
    /// The underlying writer, which accumulates the document in memory.
    writer: Writer<Vec<u8>>,
}

impl XmlBuilder {
    /// Starts a new document by emitting its XML declaration.
    pub(crate) fn new() -> FilterResult<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(Self { writer })
    }

    /// Opens element `name` with the given `attrs`, whose values get escaped.
    pub(crate) fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> FilterResult<()> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    /// Closes element `name`.
    pub(crate) fn end(&mut self, name: &str) -> FilterResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Emits element `name` without children.
    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> FilterResult<()> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    /// Emits element `name` wrapping the escaped `text`.
    pub(crate) fn text(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> FilterResult<()> {
        self.start(name, attrs)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    /// Emits element `name` wrapping `text` only if there is some text.
    pub(crate) fn optional_text(&mut self, name: &str, text: Option<&str>) -> FilterResult<()> {
        match text {
            Some(text) if !text.is_empty() => self.text(name, &[], text),
            _ => Ok(()),
        }
    }

    /// Terminates the document and returns its textual representation.
    pub(crate) fn finish(self) -> FilterResult<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| FilterError::Xml(format!("Invalid UTF-8 in document: {}", e)))
    }
}
