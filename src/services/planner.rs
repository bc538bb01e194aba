//! PolicyPlanner: per-endpoint decision on how to answer a request.
//!
//! The stream and download endpoints differ only in their [`StreamPolicy`];
//! whether `Range` is honored is configuration, not a property of the route.

use crate::{
    models::media::{ByteWindow, ObjectMetadata},
    services::range::{RangeDecision, parse_range},
};
use clap::ValueEnum;

/// How an endpoint treats the `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeMode {
    /// Parse `Range` and answer 206 when it is satisfiable.
    Honor,
    /// Ignore `Range`; full 200 with Content-Length when the size is known.
    Ignore,
    /// Ignore `Range`, drop Content-Length and stream chunked from offset 0.
    /// For backends that mishandle non-zero offsets.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamPolicy {
    pub range_mode: RangeMode,
    pub disposition: Disposition,
    /// Longest window a single 206 may span; `0` disables the cap.
    pub max_range_bytes: u64,
}

/// What the response will be, decided before any byte is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// 200 with the whole object. `window` covers the object when its size
    /// is known so the body is held to exactly that many bytes.
    Full {
        window: Option<ByteWindow>,
        send_length: bool,
    },
    /// 206 for one window.
    Partial(ByteWindow),
    /// 416.
    Unsatisfiable,
}

impl StreamPolicy {
    pub fn honors_ranges(&self) -> bool {
        self.range_mode == RangeMode::Honor
    }

    pub fn plan(&self, range_header: Option<&str>, metadata: &ObjectMetadata) -> Plan {
        let full_window = metadata
            .size_known()
            .then(|| ByteWindow::new(0, metadata.total_size - 1))
            .flatten();

        match self.range_mode {
            RangeMode::Fallback => Plan::Full {
                window: full_window,
                send_length: false,
            },
            RangeMode::Ignore => Plan::Full {
                window: full_window,
                send_length: full_window.is_some(),
            },
            RangeMode::Honor => match parse_range(range_header, metadata.total_size) {
                RangeDecision::NoRange => Plan::Full {
                    window: full_window,
                    send_length: full_window.is_some(),
                },
                RangeDecision::Single(window) => {
                    Plan::Partial(window.capped(self.max_range_bytes))
                }
                RangeDecision::Unsatisfiable => Plan::Unsatisfiable,
            },
        }
    }
}
