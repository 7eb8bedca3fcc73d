// Audio module - cpal host, sample clock and real-time helpers

pub mod analyser;
pub mod dsp_utils;
pub mod engine;
pub mod parameters;
pub mod timing;
