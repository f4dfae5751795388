use cortexm_interrupts::NvicError;
use cortexm_memory::MapError;
use thiserror::Error;

use crate::capabilities::CoreVariant;
use crate::image::ImageError;

/// Errors returned while constructing or resetting an [`Mcu`](crate::Mcu).
///
/// None of these are recoverable for the device being built; a front end is expected to report
/// the diagnostic and stop.
#[derive(Debug, Error)]
pub enum McuError {
    #[error("unsupported CPU model '{model}' (cortex-{} only)", CoreVariant::supported_tokens())]
    UnsupportedModel { model: String },

    #[error("unable to find CPU definition '{model}'")]
    CpuModelNotFound { model: String },

    #[error("guest image must be specified (using --image or --kernel)")]
    MissingImage,

    #[error(transparent)]
    ImageLoad(#[from] ImageError),

    #[error("invalid memory map: {0}")]
    MemoryMap(#[from] MapError),

    #[error("interrupt controller construction failed: {0}")]
    InterruptController(#[from] NvicError),

    #[error("device must be realized before it can be reset")]
    NotRealized,
}
