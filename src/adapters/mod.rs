//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to               |
//! |----------------|--------------------|---------------------------|
//! | `host`         | TimePort           | `Instant` + async-io-mini |
//! |                | NotifierPort       | Log output                |
//! |                | LauncherPort       | Log / `xdg-open`          |
//! |                | LocationPort       | Fixed home position       |
//! |                | RelayPort          | delegates to `relay_http` |
//! | `relay_http`   | RelayPort          | reqwest (blocking, thread)|
//! | `kv_store`     | StoragePort        | JSON file / in-memory map |
//! |                | ProfilePort        |                           |
//! | `log_sink`     | EventSink          | Log output                |
//! | `stdin_source` | TelemetrySource    | Line reader thread        |

pub mod host;
pub mod kv_store;
pub mod log_sink;
pub mod relay_http;
pub mod stdin_source;
pub(super) mod utils;
