// gpu/error.rs — error taxonomy for the GPU session.
//
// Two layers, mirroring how a raw compute API reports failure:
//
//   `Status` — the closed mapping of device-API outcomes. wgpu collapses
//   the zoo of native error codes into three uncaptured-error variants
//   (OutOfMemory / Validation / Internal); we map those onto the status
//   vocabulary the rest of the crate speaks. Success is simply `Ok(..)`.
//
//   `Error` — what callers see: which class of operation failed
//   (configuration, program build, resource management, execution, or
//   input validation), the operation's name, and the source location of
//   the failing call. Program-build failures additionally carry the full
//   compiler log — the only error path with extra diagnostic payload.
//
// Every device failure is fatal to the current call: no retry, no
// partial result. `#[track_caller]` on the constructors records the
// call site without any macro plumbing at the use sites.

use std::fmt;
use std::panic::Location;

/// Closed device-status taxonomy (success is `Ok`, not a variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No compute device visible to the backend.
    DeviceNotFound,
    /// Device or host allocation failure during a device operation.
    OutOfDeviceMemory,
    /// Kernel source failed to compile or validate.
    ProgramBuildFailed,
    /// A resource-management call was rejected (bad size, bad usage, ...).
    InvalidArgument,
    /// A dispatch or readback was rejected by the device.
    InvalidKernelInvocation,
    /// Anything the backend reports as an internal error.
    Unknown,
}

impl Status {
    /// Map a wgpu uncaptured error raised by a resource-management call.
    fn from_resource(e: &wgpu::Error) -> Self {
        match e {
            wgpu::Error::OutOfMemory { .. } => Status::OutOfDeviceMemory,
            wgpu::Error::Validation { .. } => Status::InvalidArgument,
            wgpu::Error::Internal { .. } => Status::Unknown,
        }
    }

    /// Map a wgpu uncaptured error raised by a dispatch or readback.
    fn from_execution(e: &wgpu::Error) -> Self {
        match e {
            wgpu::Error::OutOfMemory { .. } => Status::OutOfDeviceMemory,
            wgpu::Error::Validation { .. } => Status::InvalidKernelInvocation,
            wgpu::Error::Internal { .. } => Status::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::DeviceNotFound => "device not found",
            Status::OutOfDeviceMemory => "out of device memory",
            Status::ProgramBuildFailed => "program build failed",
            Status::InvalidArgument => "invalid argument",
            Status::InvalidKernelInvocation => "invalid kernel invocation",
            Status::Unknown => "unknown device error",
        };
        f.write_str(s)
    }
}

/// A fatal error from the GPU session.
#[derive(Debug)]
pub enum Error {
    /// Device selection or size-parameter validation failed.
    Configuration {
        op: &'static str,
        status: Status,
        detail: String,
        location: &'static Location<'static>,
    },
    /// Kernel source failed to compile; `log` is the compiler diagnostic.
    Build {
        log: String,
        location: &'static Location<'static>,
    },
    /// Buffer or pipeline creation failed.
    Resource {
        op: &'static str,
        status: Status,
        detail: String,
        location: &'static Location<'static>,
    },
    /// Dispatch or readback failed.
    Execution {
        op: &'static str,
        status: Status,
        detail: String,
        location: &'static Location<'static>,
    },
    /// The call itself was invalid (released session, bad count, ...).
    InvalidInput { detail: String },
}

impl Error {
    #[track_caller]
    pub(crate) fn configuration(op: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Error::Configuration {
            op,
            status,
            detail: detail.into(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub(crate) fn build(log: String) -> Self {
        Error::Build {
            log,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub(crate) fn resource(op: &'static str, e: &wgpu::Error) -> Self {
        Error::Resource {
            op,
            status: Status::from_resource(e),
            detail: e.to_string(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub(crate) fn execution(op: &'static str, e: &wgpu::Error) -> Self {
        Error::Execution {
            op,
            status: Status::from_execution(e),
            detail: e.to_string(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub(crate) fn execution_status(op: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Error::Execution {
            op,
            status,
            detail: detail.into(),
            location: Location::caller(),
        }
    }

    pub(crate) fn invalid_input(detail: impl Into<String>) -> Self {
        Error::InvalidInput {
            detail: detail.into(),
        }
    }

    /// The mapped device status, where one applies.
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Configuration { status, .. }
            | Error::Resource { status, .. }
            | Error::Execution { status, .. } => Some(*status),
            Error::Build { .. } => Some(Status::ProgramBuildFailed),
            Error::InvalidInput { .. } => None,
        }
    }

    /// Compiler diagnostic text, present only for build failures.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            Error::Build { log, .. } => Some(log),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration { op, status, detail, location } => write!(
                f,
                "configuration failed in {op} ({status}) at {location}: {detail}"
            ),
            Error::Build { log, location } => write!(
                f,
                "kernel program build failed at {location}:\n{log}"
            ),
            Error::Resource { op, status, detail, location } => write!(
                f,
                "resource operation {op} failed ({status}) at {location}: {detail}"
            ),
            Error::Execution { op, status, detail, location } => write!(
                f,
                "execution of {op} failed ({status}) at {location}: {detail}"
            ),
            Error::InvalidInput { detail } => write!(f, "invalid input: {detail}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_carries_log() {
        let err = Error::build("error: unknown identifier 'foo'".to_string());
        assert_eq!(err.status(), Some(Status::ProgramBuildFailed));
        assert!(err.build_log().unwrap().contains("unknown identifier"));
        assert!(err.to_string().contains("unknown identifier"));
    }

    #[test]
    fn display_names_operation_and_location() {
        let err = Error::configuration("select_device", Status::DeviceNotFound, "no adapters");
        let msg = err.to_string();
        assert!(msg.contains("select_device"));
        assert!(msg.contains("device not found"));
        assert!(msg.contains("error.rs"), "location missing from: {msg}");
    }

    #[test]
    fn invalid_input_has_no_status() {
        let err = Error::invalid_input("session released");
        assert_eq!(err.status(), None);
    }
}
