pub mod error;
pub mod status;
pub mod logging;
pub mod identifier;
pub mod volume;
pub mod buffer;
pub mod settings;
pub mod session;
pub mod codec;
pub mod plugin;

pub use error::{PluginError, ErrorKind};
pub use status::Status;
pub use identifier::{Identifier, scan};
pub use session::{Direction, DiskSession, SeekMode};
pub use codec::{CapabilityDescriptor, DiskImageCodec, IsoCodec, PluginType};
pub use settings::BufferSettings;
pub use plugin::{IsoPluginApi, LoadedPlugin, iso_plugin_register};
