use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::NetworkError;

/// Anything that went wrong inside a contained lifecycle call.
#[derive(Debug)]
pub enum Fault {
    /// The call returned an error.
    Error(NetworkError),
    /// The call panicked.
    Panic(String),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Error(err) => write!(f, "{err}"),
            Fault::Panic(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

impl Fault {
    /// Report the fault against `network` and the lifecycle `operation` that raised it.
    pub fn report(&self, network: &str, operation: &str) {
        match self {
            Fault::Error(NetworkError::Initialization { message, .. }) => {
                log::error!("{network}: {operation} caught initialization error: {message}")
            }
            Fault::Error(err) => log::error!("{network}: {operation} caught error: {err}"),
            Fault::Panic(msg) => log::error!("{network}: {operation} caught panic: {msg}"),
        }
    }
}

impl From<NetworkError> for Fault {
    fn from(err: NetworkError) -> Self {
        Fault::Error(err)
    }
}

/// Run `f`, turning both a returned error and a panic into a [`Fault`].
pub fn isolate<T>(f: impl FnOnce() -> Result<T, NetworkError>) -> Result<T, Fault> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(Fault::Error),
        Err(payload) => Err(Fault::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
