use std::sync::Arc;

use crate::error::{SimError, SimResult};

/// Runs `f` inside validation and out-of-memory error scopes.
///
/// A device error raised while `f` runs is mapped through `on_error`. An error
/// returned by `f` itself takes precedence.
pub(crate) fn scoped<T>(
    device: &wgpu::Device,
    on_error: impl FnOnce(String) -> SimError,
    f: impl FnOnce() -> SimResult<T>,
) -> SimResult<T> {
    let oom = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let validation = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = f();
    // Scopes pop in reverse push order.
    let validation_err = pollster::block_on(validation.pop());
    let oom_err = pollster::block_on(oom.pop());

    let value = result?;
    match validation_err.or(oom_err) {
        Some(err) => Err(on_error(err.to_string())),
        None => Ok(value),
    }
}

/// Logs device errors that escape every scope instead of panicking.
pub(crate) fn log_uncaptured_errors(device: &wgpu::Device) {
    device.on_uncaptured_error(Arc::new(|error| {
        log::error!("uncaptured device error: {error}");
    }));
}
