//! Upload page state machine.

use super::format::FileCard;

/// Where an upload stands from the user's point of view.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadPhase {
    /// Nothing selected.
    #[default]
    Idle,
    /// A file is selected but not yet submitted.
    FileSelected(Selection),
    /// Upload in flight.
    Uploading { selection: Selection, percent: u8 },
    /// Upload finished and the share link is known.
    Complete {
        selection: Selection,
        share_url: String,
    },
    /// Upload rejected or failed. The selection is kept for a manual retry.
    Failed {
        selection: Option<Selection>,
        notice: Notice,
    },
}

/// The currently selected file.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

impl Selection {
    pub fn new(name: impl Into<String>, size: u64, mime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime: mime.into(),
        }
    }

    pub fn card(&self) -> FileCard {
        FileCard::new(&self.name, self.size, &self.mime)
    }
}

/// User-facing failure notice, as catalog keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoFile,
    TooLarge,
    Failed,
    RateLimited,
}

impl Notice {
    /// Title and detail message keys.
    pub fn keys(&self) -> (&'static str, &'static str) {
        match self {
            Notice::NoFile => ("upload.no_file_title", "upload.no_file_detail"),
            Notice::TooLarge => ("upload.too_large_title", "upload.too_large_detail"),
            Notice::Failed => ("upload.failed_title", "upload.failed_detail"),
            Notice::RateLimited => ("upload.failed_title", "upload.rate_limited"),
        }
    }
}

impl UploadPhase {
    /// Select a file, replacing any earlier selection.
    ///
    /// Ignored while an upload is in flight.
    pub fn select(self, selection: Selection) -> Self {
        match self {
            UploadPhase::Uploading { .. } => self,
            _ => UploadPhase::FileSelected(selection),
        }
    }

    /// Clear the selection. Ignored while an upload is in flight.
    pub fn remove(self) -> Self {
        match self {
            UploadPhase::Uploading { .. } => self,
            _ => UploadPhase::Idle,
        }
    }

    /// Validate the selection against `limit` and start uploading.
    ///
    /// Sizes equal to the limit are accepted. A rejected submit goes straight
    /// to `Failed` without passing through `Uploading`.
    pub fn submit(self, limit: u64) -> Self {
        match self {
            UploadPhase::Idle => UploadPhase::Failed {
                selection: None,
                notice: Notice::NoFile,
            },
            UploadPhase::FileSelected(selection)
            | UploadPhase::Failed {
                selection: Some(selection),
                ..
            } => {
                if selection.size > limit {
                    UploadPhase::Failed {
                        selection: Some(selection),
                        notice: Notice::TooLarge,
                    }
                } else {
                    UploadPhase::Uploading {
                        selection,
                        percent: 0,
                    }
                }
            }
            UploadPhase::Failed {
                selection: None, ..
            } => UploadPhase::Failed {
                selection: None,
                notice: Notice::NoFile,
            },
            other => other,
        }
    }

    /// Report progress. Only meaningful while uploading.
    pub fn progress(self, value: u8) -> Self {
        match self {
            UploadPhase::Uploading { selection, .. } => UploadPhase::Uploading {
                selection,
                percent: value.min(100),
            },
            other => other,
        }
    }

    /// Settle the upload successfully.
    pub fn complete(self, share_url: impl Into<String>) -> Self {
        match self {
            UploadPhase::Uploading { selection, .. } => UploadPhase::Complete {
                selection,
                share_url: share_url.into(),
            },
            other => other,
        }
    }

    /// Settle the upload with a failure.
    pub fn fail(self, notice: Notice) -> Self {
        match self {
            UploadPhase::Uploading { selection, .. } | UploadPhase::FileSelected(selection) => {
                UploadPhase::Failed {
                    selection: Some(selection),
                    notice,
                }
            }
            UploadPhase::Idle => UploadPhase::Failed {
                selection: None,
                notice,
            },
            other => other,
        }
    }

    /// Percentage shown by the progress bar. Hidden unless uploading or complete.
    pub fn percent(&self) -> Option<u8> {
        match self {
            UploadPhase::Uploading { percent, .. } => Some(*percent),
            UploadPhase::Complete { .. } => Some(100),
            _ => None,
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        match self {
            UploadPhase::Idle => None,
            UploadPhase::FileSelected(selection)
            | UploadPhase::Uploading { selection, .. }
            | UploadPhase::Complete { selection, .. } => Some(selection),
            UploadPhase::Failed { selection, .. } => selection.as_ref(),
        }
    }

    /// Short name used by templates.
    pub fn name(&self) -> &'static str {
        match self {
            UploadPhase::Idle => "idle",
            UploadPhase::FileSelected(_) => "selected",
            UploadPhase::Uploading { .. } => "uploading",
            UploadPhase::Complete { .. } => "complete",
            UploadPhase::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: u64 = 100 * 1024 * 1024;

    fn pdf(size: u64) -> Selection {
        Selection::new("report.pdf", size, "application/pdf")
    }

    #[test]
    fn test_happy_path() {
        let phase = UploadPhase::Idle
            .select(pdf(5 * 1024 * 1024))
            .submit(LIMIT)
            .progress(40);
        assert_eq!(phase.name(), "uploading");
        assert_eq!(phase.percent(), Some(40));

        let phase = phase.complete("https://share.example.com/download/abc");
        assert_eq!(phase.name(), "complete");
        assert_eq!(phase.percent(), Some(100));
        assert_eq!(phase.selection().unwrap().name, "report.pdf");
    }

    #[test]
    fn test_submit_without_file() {
        let phase = UploadPhase::Idle.submit(LIMIT);
        assert_eq!(
            phase,
            UploadPhase::Failed {
                selection: None,
                notice: Notice::NoFile
            }
        );
        assert_eq!(phase.percent(), None);
    }

    #[test]
    fn test_submit_too_large_skips_uploading() {
        let phase = UploadPhase::Idle.select(pdf(LIMIT + 1)).submit(LIMIT);
        assert!(matches!(
            phase,
            UploadPhase::Failed {
                selection: Some(_),
                notice: Notice::TooLarge
            }
        ));
        assert_eq!(phase.percent(), None);
    }

    #[test]
    fn test_submit_at_limit_is_accepted() {
        let phase = UploadPhase::Idle.select(pdf(LIMIT)).submit(LIMIT);
        assert_eq!(phase.name(), "uploading");
        assert_eq!(phase.percent(), Some(0));
    }

    #[test]
    fn test_select_replaces_selection() {
        let phase = UploadPhase::Idle
            .select(pdf(1))
            .select(Selection::new("b.png", 2, "image/png"));
        assert_eq!(phase.selection().unwrap().name, "b.png");
    }

    #[test]
    fn test_remove_returns_to_idle() {
        let phase = UploadPhase::Idle.select(pdf(1)).remove();
        assert_eq!(phase, UploadPhase::Idle);

        let phase = UploadPhase::Idle
            .select(pdf(1))
            .submit(LIMIT)
            .complete("u")
            .remove();
        assert_eq!(phase, UploadPhase::Idle);
    }

    #[test]
    fn test_uploading_ignores_select_and_remove() {
        let phase = UploadPhase::Idle.select(pdf(1)).submit(LIMIT);
        let phase = phase.select(pdf(2)).remove();
        assert_eq!(phase.name(), "uploading");
        assert_eq!(phase.selection().unwrap().size, 1);
    }

    #[test]
    fn test_failure_keeps_selection_for_retry() {
        let phase = UploadPhase::Idle
            .select(pdf(1))
            .submit(LIMIT)
            .fail(Notice::Failed);
        assert_eq!(phase.selection().unwrap().name, "report.pdf");

        let retried = phase.submit(LIMIT);
        assert_eq!(retried.name(), "uploading");
    }

    #[test]
    fn test_progress_clamped() {
        let phase = UploadPhase::Idle.select(pdf(1)).submit(LIMIT).progress(250);
        assert_eq!(phase.percent(), Some(100));
    }

    #[test]
    fn test_notice_keys() {
        assert_eq!(
            Notice::TooLarge.keys(),
            ("upload.too_large_title", "upload.too_large_detail")
        );
        assert_eq!(Notice::Failed.keys().1, "upload.failed_detail");
        assert_eq!(Notice::RateLimited.keys().1, "upload.rate_limited");
    }
}
