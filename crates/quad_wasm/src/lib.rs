//! WASM bridge exposing `quad_core` integrands, rules and convergence studies
//! to JavaScript.

mod integrand;
mod study;

pub use integrand::WasmIntegrand;
