#[macro_use]
extern crate log;

mod error;
pub use error::{ParseLabelError, ValidationError};

mod stage;
pub use stage::{RespiratoryEvent, StageGroup, StageKind};

mod epoch;
pub use epoch::Epoch;

mod timeline;
pub use timeline::{MAX_GAP_EPOCHS, Timeline};
