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

//! Public views of published preprints.

use crate::db;
use crate::driver::Driver;
use crate::model::{
    Galley, Publication, PublicationId, PublicationStatus, Server, Submission, SubmissionFileId,
    SubmissionId,
};
use pubexport_core::db::{DbError, Executor};
use pubexport_core::driver::{DriverError, DriverResult};
use serde::Serialize;
use std::io;
use url::Url;

/// Contents of the landing page of a preprint.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LandingPage {
    /// The preprint.
    pub(crate) submission: Submission,

    /// The displayed version of the preprint.
    pub(crate) publication: Publication,

    /// The galleys of the displayed version.
    pub(crate) galleys: Vec<Galley>,

    /// Identifier of the current version of the preprint.
    pub(crate) current_publication_id: PublicationId,

    /// Identifier of the first version of the preprint.
    pub(crate) first_publication_id: PublicationId,

    /// Whether search engines should skip the page, which happens for old versions.
    pub(crate) noindex: bool,
}

/// Result of looking up the landing page of a preprint.
#[derive(Debug, PartialEq)]
pub(crate) enum Landing {
    /// The preprint lives at a different URL.
    Redirect(Url),

    /// The page to display.
    Page(LandingPage),
}

/// Result of looking up a galley for download.
#[derive(Debug, PartialEq)]
pub(crate) enum GalleyDownload {
    /// The galley is hosted elsewhere.
    Redirect(String),

    /// A stored file to return.
    File {
        /// Display name of the file.
        name: String,

        /// MIME type of the file.
        mime_type: String,

        /// Contents of the file.
        contents: Vec<u8>,
    },
}

/// Finds the published preprint identified by `preprint_id` within `server`.
///
/// The identifier is first looked up as a custom URL path and, if that fails, as a numeric
/// submission identifier.
async fn find_published_preprint(
    ex: &mut Executor,
    server: &Server,
    preprint_id: &str,
) -> DriverResult<Submission> {
    let not_found = || DriverError::NotFound(format!("Preprint {} not found", preprint_id));

    let submission = match db::get_submission_by_url_path(ex, *server.id(), preprint_id).await {
        Ok(submission) => submission,
        Err(DbError::NotFound) => {
            let id = preprint_id.parse::<i64>().map_err(|_| not_found())?;
            match db::get_submission(ex, SubmissionId::new(id)).await {
                Ok(submission) if submission.server_id() == server.id() => submission,
                Ok(_) | Err(DbError::NotFound) => return Err(not_found()),
                Err(e) => return Err(e.into()),
            }
        }
        Err(e) => return Err(e.into()),
    };

    if *submission.status() != PublicationStatus::Published {
        return Err(not_found());
    }
    Ok(submission)
}

impl Driver {
    /// Gets the landing page of `preprint_id` within `server_path`, optionally for the older
    /// version `version`.
    pub(crate) async fn get_landing(
        self,
        server_path: &str,
        preprint_id: &str,
        version: Option<PublicationId>,
    ) -> DriverResult<Landing> {
        let mut ex = self.db.ex().await?;
        let server = self.server(&mut ex, server_path).await?;
        let submission = find_published_preprint(&mut ex, &server, preprint_id).await?;

        if preprint_id != submission.best_id() {
            let mut path = format!("{}/preprint/view/{}", server.path(), submission.best_id());
            if let Some(version) = version {
                path.push_str(&format!("/version/{}", version));
            }
            return Ok(Landing::Redirect(self.base_urls.make_frontend_url(&path)));
        }

        let current_publication_id = match submission.current_publication_id() {
            Some(id) => *id,
            None => {
                return Err(DriverError::NotFound(format!(
                    "Preprint {} has no publication",
                    preprint_id
                )));
            }
        };
        let publications = db::get_publications(&mut ex, *submission.id()).await?;
        let first_publication_id = match publications.first() {
            Some(publication) => *publication.id(),
            None => current_publication_id,
        };

        let wanted = version.unwrap_or(current_publication_id);
        let publication = match publications.into_iter().find(|p| *p.id() == wanted) {
            Some(p) if *p.status() == PublicationStatus::Published => p,
            _ => {
                return Err(DriverError::NotFound(format!(
                    "Version {} of preprint {} not found",
                    wanted, preprint_id
                )));
            }
        };

        let galleys = db::get_galleys(&mut ex, *publication.id()).await?;
        Ok(Landing::Page(LandingPage {
            noindex: *publication.id() != current_publication_id,
            submission,
            publication,
            galleys,
            current_publication_id,
            first_publication_id,
        }))
    }

    /// Gets the contents of the galley `galley_id` of `preprint_id` within `server_path`.
    ///
    /// The galley is looked up in the publication `version` if given, or in the current
    /// publication otherwise, and that publication must be published.  A galley that only exists
    /// in another published version redirects to the landing page of the preprint.
    ///
    /// When `file_id` is given, returns that file instead of the galley file as long as it is a
    /// dependent file of it.
    pub(crate) async fn get_download(
        self,
        server_path: &str,
        preprint_id: &str,
        galley_id: &str,
        version: Option<PublicationId>,
        file_id: Option<SubmissionFileId>,
    ) -> DriverResult<GalleyDownload> {
        let mut ex = self.db.ex().await?;
        let server = self.server(&mut ex, server_path).await?;
        let submission = find_published_preprint(&mut ex, &server, preprint_id).await?;

        let not_found = || DriverError::NotFound(format!("Galley {} not found", galley_id));
        let publications = db::get_publications(&mut ex, *submission.id()).await?;
        let wanted = match version {
            Some(version) => version,
            None => submission.current_publication_id().ok_or_else(not_found)?,
        };
        match publications.iter().find(|p| *p.id() == wanted) {
            Some(p) if *p.status() == PublicationStatus::Published => (),
            _ => {
                return Err(DriverError::NotFound(format!(
                    "Version {} of preprint {} not found",
                    wanted, preprint_id
                )));
            }
        }

        let galley = match db::get_galleys(&mut ex, wanted)
            .await?
            .into_iter()
            .find(|g| g.best_id() == galley_id)
        {
            Some(galley) => galley,
            None => {
                for publication in &publications {
                    if *publication.id() == wanted
                        || *publication.status() != PublicationStatus::Published
                    {
                        continue;
                    }
                    let galleys = db::get_galleys(&mut ex, *publication.id()).await?;
                    if galleys.iter().any(|g| g.best_id() == galley_id) {
                        let path =
                            format!("{}/preprint/view/{}", server.path(), submission.best_id());
                        let url = self.base_urls.make_frontend_url(&path);
                        return Ok(GalleyDownload::Redirect(url.to_string()));
                    }
                }
                return Err(not_found());
            }
        };

        if galley.is_remote() {
            if let Some(url) = galley.url_remote() {
                return Ok(GalleyDownload::Redirect(url.clone()));
            }
        }

        let galley_file_id = galley.submission_file_id().ok_or_else(|| {
            DriverError::NotFound(format!("Galley {} has no file", galley_id))
        })?;
        let wanted = match file_id {
            None => galley_file_id,
            Some(id) if id == galley_file_id => id,
            Some(id) => {
                let dependents = db::get_dependent_files(&mut ex, galley_file_id).await?;
                if !dependents.iter().any(|f| *f.id() == id) {
                    return Err(DriverError::NotFound(format!(
                        "File {} not found in galley {}",
                        id, galley_id
                    )));
                }
                id
            }
        };

        let file = db::get_submission_file(&mut ex, wanted).await?;
        let path = self.opts.files_path.join(file.path());
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DriverError::NotFound(format!("File {} not found", file.id())));
            }
            Err(e) => {
                return Err(DriverError::BackendError(format!(
                    "Cannot read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        Ok(GalleyDownload::File {
            name: file.name().clone(),
            mime_type: file.mime_type().clone(),
            contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use crate::model::*;

    /// Attaches a file named `name` with `contents` to the first galley of `preprint`.
    async fn attach_file(
        context: &mut TestContext,
        preprint: &Preprint,
        name: &str,
        contents: &[u8],
    ) -> SubmissionFile {
        let galley_id = *preprint.galleys()[0].id();
        let assoc = Some(FileAssoc::Galley(galley_id));
        let file = context.put_file(*preprint.submission().id(), name, contents, assoc).await;
        db::set_galley_file(&mut context.ex().await, galley_id, *file.id()).await.unwrap();
        file
    }

    #[tokio::test]
    async fn test_landing_by_id() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let id = preprint.submission().id().to_string();

        let landing = context.driver().get_landing("test", &id, None).await.unwrap();
        let exp = LandingPage {
            submission: preprint.submission().clone(),
            publication: preprint.publication().clone(),
            galleys: preprint.galleys().clone(),
            current_publication_id: *preprint.publication().id(),
            first_publication_id: *preprint.publication().id(),
            noindex: false,
        };
        assert_eq!(Landing::Page(exp), landing);
    }

    #[tokio::test]
    async fn test_landing_redirects_to_best_id() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, Some("nice")).await;
        let id = preprint.submission().id().to_string();

        let landing = context.driver().get_landing("test", &id, None).await.unwrap();
        assert_eq!(
            Landing::Redirect(Url::parse("https://example.com/test/preprint/view/nice").unwrap()),
            landing
        );

        let version = Some(*preprint.publication().id());
        let landing = context.driver().get_landing("test", &id, version).await.unwrap();
        assert_eq!(
            Landing::Redirect(
                Url::parse(&format!(
                    "https://example.com/test/preprint/view/nice/version/{}",
                    preprint.publication().id()
                ))
                .unwrap()
            ),
            landing
        );

        match context.driver().get_landing("test", "nice", None).await.unwrap() {
            Landing::Page(page) => assert_eq!(preprint.submission(), &page.submission),
            l => panic!("Unexpected landing {:?}", l),
        }
    }

    #[tokio::test]
    async fn test_landing_unpublished_or_unknown() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Queued, None).await;
        let id = preprint.submission().id().to_string();

        for id in [id.as_str(), "999", "not-a-path"] {
            match context.driver().get_landing("test", id, None).await {
                Err(DriverError::NotFound(msg)) => assert!(msg.contains("not found")),
                r => panic!("Unexpected result {:?}", r),
            }
        }
    }

    #[tokio::test]
    async fn test_landing_other_server() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        db::put_server(&mut context.ex().await, "other", "Other", None).await.unwrap();
        let id = preprint.submission().id().to_string();

        match context.driver().get_landing("other", &id, None).await {
            Err(DriverError::NotFound(_)) => (),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[tokio::test]
    async fn test_landing_versions() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();
        let id = sub_id.to_string();
        let first = *preprint.publication().id();

        let second = context.driver().create_version("test", sub_id).await.unwrap();

        match context.driver().get_landing("test", &id, Some(*second.id())).await {
            Err(DriverError::NotFound(msg)) => assert!(msg.contains("Version")),
            r => panic!("Unexpected result {:?}", r),
        }

        context.driver().publish("test", *second.id()).await.unwrap();

        match context.driver().get_landing("test", &id, None).await.unwrap() {
            Landing::Page(page) => {
                assert_eq!(second.id(), page.publication.id());
                assert_eq!(*second.id(), page.current_publication_id);
                assert_eq!(first, page.first_publication_id);
                assert!(!page.noindex);
                assert_eq!(1, page.galleys.len());
            }
            l => panic!("Unexpected landing {:?}", l),
        }

        match context.driver().get_landing("test", &id, Some(first)).await.unwrap() {
            Landing::Page(page) => {
                assert_eq!(&first, page.publication.id());
                assert!(page.noindex);
            }
            l => panic!("Unexpected landing {:?}", l),
        }
    }

    #[tokio::test]
    async fn test_download_galley_file() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let file = attach_file(&mut context, &preprint, "paper.pdf", b"the paper").await;
        let id = preprint.submission().id().to_string();
        let galley_id = preprint.galleys()[0].best_id();

        let download =
            context.driver().get_download("test", &id, &galley_id, None, None).await.unwrap();
        assert_eq!(
            GalleyDownload::File {
                name: "paper.pdf".to_owned(),
                mime_type: "application/octet-stream".to_owned(),
                contents: b"the paper".to_vec(),
            },
            download
        );

        let download = context
            .driver()
            .get_download("test", &id, &galley_id, None, Some(*file.id()))
            .await
            .unwrap();
        assert!(matches!(download, GalleyDownload::File { .. }));
    }

    #[tokio::test]
    async fn test_download_dependent_file() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();
        let file = attach_file(&mut context, &preprint, "paper.html", b"<img>").await;
        let image = context
            .put_file(sub_id, "figure.png", b"png", Some(FileAssoc::SubmissionFile(*file.id())))
            .await;
        let unrelated = context.put_file(sub_id, "other.png", b"other", None).await;
        let id = sub_id.to_string();
        let galley_id = preprint.galleys()[0].best_id();

        match context.driver().get_download("test", &id, &galley_id, None, Some(*image.id())).await
        {
            Ok(GalleyDownload::File { name, contents, .. }) => {
                assert_eq!("figure.png", name);
                assert_eq!(b"png".to_vec(), contents);
            }
            r => panic!("Unexpected result {:?}", r),
        }

        match context
            .driver()
            .get_download("test", &id, &galley_id, None, Some(*unrelated.id()))
            .await
        {
            Err(DriverError::NotFound(msg)) => assert!(msg.contains("File")),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[tokio::test]
    async fn test_download_remote_galley() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let publication_id = *preprint.publication().id();
        let mut galley = NewGalley::new("Remote");
        galley.url_remote = Some("https://elsewhere.example.org/paper.pdf".to_owned());
        galley.url_path = Some("remote".to_owned());
        db::put_galley(&mut context.ex().await, publication_id, galley).await.unwrap();
        let id = preprint.submission().id().to_string();

        let download =
            context.driver().get_download("test", &id, "remote", None, None).await.unwrap();
        assert_eq!(
            GalleyDownload::Redirect("https://elsewhere.example.org/paper.pdf".to_owned()),
            download
        );
    }

    #[tokio::test]
    async fn test_download_missing() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let id = preprint.submission().id().to_string();
        let galley_id = preprint.galleys()[0].best_id();

        match context.driver().get_download("test", &id, &galley_id, None, None).await {
            Err(DriverError::NotFound(msg)) => assert!(msg.contains("has no file")),
            r => panic!("Unexpected result {:?}", r),
        }

        match context.driver().get_download("test", &id, "12345", None, None).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Galley 12345 not found", msg),
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[tokio::test]
    async fn test_download_file_missing_on_disk() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let file = attach_file(&mut context, &preprint, "paper.pdf", b"the paper").await;
        std::fs::remove_file(context.files_dir().join(file.path())).unwrap();
        let id = preprint.submission().id().to_string();
        let galley_id = preprint.galleys()[0].best_id();

        match context.driver().get_download("test", &id, &galley_id, None, None).await {
            Err(DriverError::NotFound(msg)) => {
                assert_eq!(format!("File {} not found", file.id()), msg)
            }
            r => panic!("Unexpected result {:?}", r),
        }
    }

    #[tokio::test]
    async fn test_download_current_version_not_published() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();
        let id = sub_id.to_string();

        let draft = context.driver().create_version("test", sub_id).await.unwrap();
        let draft_galleys = db::get_galleys(&mut context.ex().await, *draft.id()).await.unwrap();
        let draft_galley = draft_galleys[0].clone();
        context
            .driver()
            .store_galley_file("test", *draft_galley.id(), "draft.pdf", "application/pdf", b"DRAFT")
            .await
            .unwrap();
        context.driver().delete_publication("test", *preprint.publication().id()).await.unwrap();

        for version in [None, Some(*draft.id())] {
            match context
                .driver()
                .get_download("test", &id, &draft_galley.best_id(), version, None)
                .await
            {
                Err(DriverError::NotFound(msg)) => assert!(msg.starts_with("Version")),
                r => panic!("Unexpected result {:?}", r),
            }
        }
    }

    #[tokio::test]
    async fn test_download_versions() {
        let mut context = TestContext::setup().await;
        let preprint = context.put_preprint(PublicationStatus::Published, None).await;
        let sub_id = *preprint.submission().id();
        let id = sub_id.to_string();
        let first = *preprint.publication().id();
        attach_file(&mut context, &preprint, "paper.pdf", b"first").await;
        let old_galley_id = preprint.galleys()[0].best_id();

        let second = context.driver().create_version("test", sub_id).await.unwrap();
        let new_galley_id =
            db::get_galleys(&mut context.ex().await, *second.id()).await.unwrap()[0].best_id();

        match context.driver().get_download("test", &id, &new_galley_id, None, None).await {
            Err(DriverError::NotFound(msg)) => {
                assert_eq!(format!("Galley {} not found", new_galley_id), msg)
            }
            r => panic!("Unexpected result {:?}", r),
        }

        context.driver().publish("test", *second.id()).await.unwrap();

        let download = context
            .driver()
            .get_download("test", &id, &old_galley_id, Some(first), None)
            .await
            .unwrap();
        match download {
            GalleyDownload::File { contents, .. } => assert_eq!(b"first".to_vec(), contents),
            d => panic!("Unexpected download {:?}", d),
        }

        let download =
            context.driver().get_download("test", &id, &old_galley_id, None, None).await.unwrap();
        assert_eq!(
            GalleyDownload::Redirect(format!("https://example.com/test/preprint/view/{}", sub_id)),
            download
        );

        let download =
            context.driver().get_download("test", &id, &new_galley_id, None, None).await.unwrap();
        assert!(matches!(download, GalleyDownload::File { .. }));

        match context
            .driver()
            .get_download("test", &id, &old_galley_id, Some(PublicationId::new(999)), None)
            .await
        {
            Err(DriverError::NotFound(msg)) => assert!(msg.starts_with("Version 999")),
            r => panic!("Unexpected result {:?}", r),
        }
    }
}
