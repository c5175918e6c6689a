// Import wizard: upload -> review -> import, one wizard per principal.

use crate::{
    models::UserRecord,
    services::import_service::{self, ImportError, ImportOptions, ImportSummary},
    utils::AppError,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WizardState {
    #[default]
    AwaitingUpload,
    Reviewing {
        batch: Vec<UserRecord>,
    },
    Importing {
        batch: Vec<UserRecord>,
    },
    Done {
        written: usize,
    },
}

impl WizardState {
    pub fn name(&self) -> &'static str {
        match self {
            WizardState::AwaitingUpload => "awaiting_upload",
            WizardState::Reviewing { .. } => "reviewing",
            WizardState::Importing { .. } => "importing",
            WizardState::Done { .. } => "done",
        }
    }

    /// Stepper position: Upload JSON, Review Data, Import.
    pub fn step(&self) -> usize {
        match self {
            WizardState::AwaitingUpload => 0,
            WizardState::Reviewing { .. } | WizardState::Importing { .. } => 1,
            WizardState::Done { .. } => 2,
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportWizard {
    state: WizardState,
}

fn invalid(action: &str, state: &WizardState) -> AppError {
    AppError::InvalidTransition(format!("Cannot {} while {}", action, state.name()))
}

impl ImportWizard {
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Returns the number of users staged for review.
    pub fn upload(&mut self, buffer: &[u8], options: ImportOptions) -> Result<usize, AppError> {
        if self.state != WizardState::AwaitingUpload {
            return Err(invalid("upload", &self.state));
        }

        let batch = import_service::prepare_batch(buffer, options)?;
        let count = batch.len();
        self.state = WizardState::Reviewing { batch };
        Ok(count)
    }

    /// Hands out the reviewed batch; the caller reports back through `finish`.
    pub fn begin_import(&mut self) -> Result<Vec<UserRecord>, AppError> {
        match &self.state {
            WizardState::Reviewing { batch } => {
                let batch = batch.clone();
                self.state = WizardState::Importing {
                    batch: batch.clone(),
                };
                Ok(batch)
            }
            other => Err(invalid("import", other)),
        }
    }

    /// A failed import returns to review with the same batch.
    pub fn finish(&mut self, outcome: &Result<ImportSummary, ImportError>) -> Result<(), AppError> {
        let batch = match std::mem::take(&mut self.state) {
            WizardState::Importing { batch } => batch,
            other => {
                let err = invalid("finish import", &other);
                self.state = other;
                return Err(err);
            }
        };

        self.state = match outcome {
            Ok(summary) => WizardState::Done {
                written: summary.written,
            },
            Err(_) => WizardState::Reviewing { batch },
        };
        Ok(())
    }

    /// An import that never reported back returns to review.
    fn abandon(&mut self) {
        if let WizardState::Importing { batch } = std::mem::take(&mut self.state) {
            self.state = WizardState::Reviewing { batch };
        }
    }

    pub fn reset(&mut self) -> Result<(), AppError> {
        if let WizardState::Importing { .. } = self.state {
            return Err(invalid("reset", &self.state));
        }
        self.state = WizardState::AwaitingUpload;
        Ok(())
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReviewRow {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "netlifyRepo")]
    pub netlify_repo: String,
}

impl From<&UserRecord> for ReviewRow {
    fn from(user: &UserRecord) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            netlify_repo: user.netlify_repo.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct WizardView {
    pub success: bool,
    pub state: String,
    pub step: usize,
    pub importing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<ReviewRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WizardView {
    pub fn of(state: &WizardState) -> Self {
        let (users, written) = match state {
            WizardState::Reviewing { batch } | WizardState::Importing { batch } => {
                (Some(batch.iter().map(ReviewRow::from).collect::<Vec<_>>()), None)
            }
            WizardState::Done { written } => (None, Some(*written)),
            WizardState::AwaitingUpload => (None, None),
        };

        Self {
            success: true,
            state: state.name().to_string(),
            step: state.step(),
            importing: matches!(state, WizardState::Importing { .. }),
            count: users.as_ref().map(Vec::len),
            users,
            written,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Wizards keyed by principal id. The lock is only held for state
/// transitions, never across store writes.
#[derive(Default)]
pub struct ImportWizards {
    wizards: Mutex<HashMap<String, ImportWizard>>,
}

impl ImportWizards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, principal_id: &str, f: impl FnOnce(&mut ImportWizard) -> R) -> Result<R, AppError> {
        let mut wizards = self
            .wizards
            .lock()
            .map_err(|_| AppError::InvalidRequest("import wizard state unavailable".to_string()))?;
        let wizard = wizards.entry(principal_id.to_string()).or_default();
        Ok(f(wizard))
    }

    pub fn view(&self, principal_id: &str) -> Result<WizardView, AppError> {
        self.with(principal_id, |wizard| WizardView::of(wizard.state()))
    }

    /// Move the principal's wizard to `importing` and hand back the batch.
    pub fn begin_import(&self, principal_id: &str) -> Result<ImportRun<'_>, AppError> {
        let batch = self.with(principal_id, |wizard| wizard.begin_import())??;

        Ok(ImportRun {
            wizards: self,
            principal_id: principal_id.to_string(),
            batch,
            finished: false,
        })
    }
}

/// An import in flight. Dropping it before `finish` puts the wizard back
/// in review with the same batch.
pub struct ImportRun<'a> {
    wizards: &'a ImportWizards,
    principal_id: String,
    batch: Vec<UserRecord>,
    finished: bool,
}

impl ImportRun<'_> {
    pub fn batch(&self) -> &[UserRecord] {
        &self.batch
    }

    pub fn finish(mut self, outcome: &Result<ImportSummary, ImportError>) -> Result<WizardView, AppError> {
        self.finished = true;
        self.wizards.with(&self.principal_id, |wizard| {
            wizard.finish(outcome).map(|_| WizardView::of(wizard.state()))
        })?
    }
}

impl Drop for ImportRun<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        log::warn!("⚠️  Import for {} interrupted, back to review", self.principal_id);
        if let Err(e) = self.wizards.with(&self.principal_id, ImportWizard::abandon) {
            log::error!("❌ Failed to restore import wizard for {}: {}", self.principal_id, e);
        }
    }
}
