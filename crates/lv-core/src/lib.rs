pub mod architecture;
pub mod cancel;
pub mod error;
pub mod progress;


pub use architecture::BaseModel;
pub use cancel::{CancelFlag, CancellationCheck};
pub use error::{Error, Result};
pub use progress::{DENOISING_LABEL, ProgressEvent, ProgressSink, estimate_percentage};
