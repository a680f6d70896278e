//! The update engine
//!
//! `ResolvePath → Load → MergeArgs → ValidateRequired → Locate → Patch →
//! (Persist)?`. Each stage runs only after the previous one succeeded, and
//! the save at the end is the only write.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::args::{ArgumentSet, OverlaySource, merge_arguments};
use crate::locator::locate_service;
use crate::model::Service;
use crate::patcher::{ServiceField, VariantDescriptor};
use crate::resolver::resolve_document_path;
use crate::store::DocumentStore;
use crate::{BotFileError, Result};

/// One invocation of an update command
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub variant: &'static VariantDescriptor,
    /// `--bot`; when absent the working directory is searched
    pub bot: Option<PathBuf>,
    pub working_dir: PathBuf,
    pub secret: Option<String>,
    /// Arguments given directly as flags
    pub flags: ArgumentSet,
    pub overlay: Option<OverlaySource>,
}

/// Result of a successful update
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub path: PathBuf,
    /// The entry as it now stands in the document
    pub service: Service,
    pub updated: Vec<ServiceField>,
    /// False when the variant's persistence gate was not met
    pub persisted: bool,
}

pub async fn run_update<S: DocumentStore + ?Sized>(
    store: &S,
    request: UpdateRequest,
) -> Result<UpdateOutcome> {
    let variant = request.variant;

    let path = resolve_document_path(request.bot.as_deref(), &request.working_dir)?;
    let mut document = store.load(&path, request.secret.as_deref()).await?;

    let args = merge_arguments(&request.flags, request.overlay.as_ref()).await?;
    let discriminator = variant.discriminator(&args)?;

    let index = locate_service(&document.services, variant.kind, &discriminator).ok_or_else(|| {
        BotFileError::ServiceNotFound {
            label: variant.label,
            discriminator: discriminator.clone(),
        }
    })?;
    debug!(kind = %variant.kind, %discriminator, index, "located service");

    let mut patched = document.services[index].clone();
    let updated = variant.apply(&mut patched, &args)?;

    if !variant.should_persist(&args) {
        warn!(
            kind = %variant.kind,
            %discriminator,
            gate = variant.persist_gate.unwrap_or_default(),
            "required argument not supplied, bot file left unchanged"
        );
        return Ok(UpdateOutcome {
            path,
            service: document.services[index].clone(),
            updated: Vec::new(),
            persisted: false,
        });
    }

    document.services[index] = patched;
    store
        .save(&document, &path, request.secret.as_deref())
        .await?;
    info!(path = %path.display(), kind = %variant.kind, %discriminator, "updated service");

    Ok(UpdateOutcome {
        path,
        service: document.services.swap_remove(index),
        updated,
        persisted: true,
    })
}
