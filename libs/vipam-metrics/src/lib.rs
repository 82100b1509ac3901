#![doc = include_str!("../README.md")]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

use prometheus::{Encoder, TextEncoder};

pub mod metrics;

/// Render every registered metric in the Prometheus text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let metric_families = prometheus::gather();
    log::trace!("Rendering {} metric families", metric_families.len());

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
}
