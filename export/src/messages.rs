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

//! Catalog of user-visible messages, keyed like the locale files of the preprint server.
//!
//! Messages may contain a `%param%` placeholder that is replaced by the optional parameter that
//! accompanies a message key.

use pubexport_core::template;

/// Message shown after a successful deposit.
pub const REGISTER_SUCCESS: &str = "plugins.importexport.common.register.success";

/// Generic message shown after a failed deposit, with the agency's error as parameter.
pub const REGISTER_MDS_ERROR: &str = "plugins.importexport.common.register.error.mdsError";

/// Message shown when a deposited object lacks a DOI, with the object as parameter.
pub const EXPORT_NO_DOI: &str = "plugins.importexport.common.export.error.noDoi";

/// Message shown when a request selects no objects.
pub const NO_OBJECTS_SELECTED: &str = "plugins.importexport.common.error.noObjectsSelected";

/// Message shown when none of the objects given on the command line exist.
pub const UNKNOWN_OBJECTS: &str = "plugins.importexport.common.export.error.unknownObjects";

/// Message shown when the command line names an unknown server, with the path as parameter.
pub const UNKNOWN_SERVER: &str = "plugins.importexport.common.export.error.unknownServer";

/// Message shown when the command line output file cannot be written, with the path as
/// parameter.
pub const OUTPUT_NOT_WRITABLE: &str =
    "plugins.importexport.common.export.error.outputFileNotWritable";

/// Prefix printed before errors on the command line.
pub const CLI_ERROR: &str = "plugins.importexport.common.cliError";

/// Header printed before validation diagnostics.
pub const INVALID_XML: &str = "plugins.importexport.common.invalidXML";

/// Configuration error reported when required plugin settings are missing.
pub const SETTINGS_ERROR: &str = "plugins.importexport.common.error.pluginNotConfigured";

/// Known messages and their English text.
const CATALOG: &[(&str, &str)] = &[
    (REGISTER_SUCCESS, "Registration was successful!"),
    (
        REGISTER_MDS_ERROR,
        "Registration was not successful! The DOI registration server returned an error: \
         '%param%'.",
    ),
    (EXPORT_NO_DOI, "The object %param% has no DOI assigned and cannot be registered."),
    (NO_OBJECTS_SELECTED, "No objects selected."),
    (UNKNOWN_OBJECTS, "The specified objects could not be found."),
    (UNKNOWN_SERVER, "Unknown server path \"%param%\"."),
    (OUTPUT_NOT_WRITABLE, "The output file %param% is not writable."),
    (CLI_ERROR, "ERROR:"),
    (INVALID_XML, "Invalid XML:"),
    (SETTINGS_ERROR, "The plugin is not fully set up: some required settings are missing."),
    ("plugins.importexport.common.action.register", "Register"),
    ("plugins.importexport.common.action.export", "Export"),
    ("plugins.importexport.common.action.markRegistered", "Mark registered"),
    ("plugins.importexport.common.status.any", "Any Status"),
    ("plugins.importexport.common.status.notDeposited", "Not deposited"),
    ("plugins.importexport.common.status.markedRegistered", "Marked registered"),
    ("plugins.importexport.common.status.registered", "Registered"),
    ("publication.relation.none", "Preprint has not been submitted for publication"),
    ("publication.relation.submitted", "Preprint has been submitted for publication"),
    ("publication.relation.published", "Preprint has been published"),
];

/// Renders the message for `key`, substituting `param` into it when present.
///
/// Unknown keys render as `##key##` so that they stand out without breaking the caller.
pub fn translate(key: &str, param: Option<&str>) -> String {
    match CATALOG.iter().find(|(candidate, _)| *candidate == key) {
        Some((_, text)) => match param {
            Some(param) => template::apply(text, &[("param", param)]),
            None => (*text).to_owned(),
        },
        None => format!("##{}##", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_without_param() {
        assert_eq!("Registration was successful!", translate(REGISTER_SUCCESS, None));
        assert_eq!(
            "The output file %param% is not writable.",
            translate(OUTPUT_NOT_WRITABLE, None)
        );
    }

    #[test]
    fn test_translate_with_param() {
        assert_eq!(
            "Registration was not successful! The DOI registration server returned an error: \
             ' - '.",
            translate(REGISTER_MDS_ERROR, Some(" - "))
        );
        assert_eq!("Unknown server path \"foo\".", translate(UNKNOWN_SERVER, Some("foo")));
    }

    #[test]
    fn test_translate_param_ignored_when_unused() {
        assert_eq!("No objects selected.", translate(NO_OBJECTS_SELECTED, Some("x")));
    }

    #[test]
    fn test_translate_unknown_key() {
        assert_eq!("##msg.key.a##", translate("msg.key.a", Some("p1")));
        assert_eq!("##msg.key.b##", translate("msg.key.b", None));
    }
}
