//! Panic hook and report helpers that log full tracebacks

use crate::{Error, Result};
use autopsy_traceback::{context, describe, Fault, Frame, TracebackFormatter};
use std::panic::{self, PanicHookInfo};

/// Kind given to faults built from plain panic payloads
pub const PANIC_KIND: &str = "panic";

/// Install a panic hook that logs the panic as a traceback at error level.
///
/// A [`Fault`] passed to [`std::panic::panic_any`] is reported with all of
/// its frames. Any other payload becomes a `panic` fault with one frame at
/// the panic location. The hook that was installed before runs afterwards
/// only when `chain_previous` is set. Panics raised by a local's `Debug`
/// impl during capture are recovered there and not reported.
pub fn install_panic_hook(formatter: TracebackFormatter, chain_previous: bool) {
    install(formatter, chain_previous, false);
}

pub(crate) fn install(formatter: TracebackFormatter, chain_previous: bool, structured: bool) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if autopsy_traceback::frame::is_rendering() {
            return;
        }
        let fault = fault_from_panic(info);
        emit(&formatter, &fault, structured);
        if chain_previous {
            previous(info);
        }
    }));
}

/// Log `fault` as a traceback with the default exclusions, e.g. for an
/// error returned from `main`
pub fn report(fault: &Fault) {
    emit(&TracebackFormatter::default(), fault, false);
}

/// Log `message` at error level, followed by the report of the fault
/// currently being handled when there is one
pub fn log_exception(message: &str) {
    match context::current() {
        Some(fault) => match describe(Some(&fault)) {
            Ok(report) => tracing::error!(fault.kind = %fault.kind(), "{}{}", message, report),
            Err(_) => tracing::error!("{}", message),
        },
        None => tracing::error!("{}", message),
    }
}

/// The fault as a JSON document
pub fn fault_json(fault: &Fault) -> Result<String> {
    serde_json::to_string(fault).map_err(Error::from)
}

fn emit(formatter: &TracebackFormatter, fault: &Fault, structured: bool) {
    let traceback = formatter.format(fault);
    if !structured {
        tracing::error!(fault.kind = %fault.kind(), "{}", traceback);
        return;
    }

    match fault_json(fault) {
        Ok(json) => tracing::error!(fault.kind = %fault.kind(), fault = %json, "{}", traceback),
        Err(e) => {
            tracing::warn!(error = %e, "Could not serialize fault");
            tracing::error!(fault.kind = %fault.kind(), "{}", traceback);
        }
    }
}

fn fault_from_panic(info: &PanicHookInfo<'_>) -> Fault {
    let payload = info.payload();
    if let Some(fault) = payload.downcast_ref::<Fault>() {
        return fault.clone();
    }

    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    };

    let fault = Fault::new(PANIC_KIND, message);
    match info.location() {
        Some(location) => {
            let thread = std::thread::current();
            let function = format!("<thread {}>", thread.name().unwrap_or("unnamed"));
            fault.with_frame(Frame::new(location.file(), location.line(), function))
        }
        None => fault,
    }
}
