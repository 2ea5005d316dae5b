//! Path-based entry points. The `_sync` variants return plain iterators; the
//! async variants bridge them onto `futures::Stream` with a cooperative yield
//! threshold, propagating the options' cancellation token.

use crate::csv::{CsvIter, CsvOptions};
use crate::json::{JsonIter, JsonOptions};
use crate::text::TextIter;
use crate::yaml::{YamlIter, YamlOptions};
use crate::{Input, ReadError};
use futures::Stream;
use ops::ReadOptions;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

/// How long the bridge works synchronously before yielding to the scheduler.
const YIELD_THRESHOLD: Duration = Duration::from_millis(10);

pub fn text_sync(path: impl AsRef<Path>, options: ReadOptions) -> Result<TextIter, ReadError> {
    crate::text::read(Input::from_path(path)?, options)
}

pub fn text(
    path: impl AsRef<Path>,
    options: ReadOptions,
) -> Result<impl Stream<Item = Result<String, ReadError>> + Send, ReadError> {
    let token = options.cancellation.clone();
    let iter = text_sync(path, options)?;
    Ok(unify::iter_stream(iter, YIELD_THRESHOLD).with_cancellation(token))
}

pub fn csv_sync<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    options: CsvOptions,
) -> Result<CsvIter<T>, ReadError> {
    crate::csv::read(Input::from_path(path)?, options)
}

pub fn csv<T: DeserializeOwned + Send + 'static>(
    path: impl AsRef<Path>,
    options: CsvOptions,
) -> Result<impl Stream<Item = Result<T, ReadError>> + Send, ReadError> {
    let token = options.common.cancellation.clone();
    let iter = csv_sync(path, options)?;
    Ok(unify::iter_stream(iter, YIELD_THRESHOLD).with_cancellation(token))
}

pub fn json_sync<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    options: JsonOptions,
) -> Result<JsonIter<T>, ReadError> {
    crate::json::read(Input::from_path(path)?, options)
}

pub fn json<T: DeserializeOwned + Send + 'static>(
    path: impl AsRef<Path>,
    options: JsonOptions,
) -> Result<impl Stream<Item = Result<T, ReadError>> + Send, ReadError> {
    let token = options.common.cancellation.clone();
    let iter = json_sync(path, options)?;
    Ok(unify::iter_stream(iter, YIELD_THRESHOLD).with_cancellation(token))
}

pub fn yaml_sync<T: DeserializeOwned + 'static>(
    path: impl AsRef<Path>,
    options: YamlOptions,
) -> Result<YamlIter<T>, ReadError> {
    crate::yaml::read(Input::from_path(path)?, options)
}

pub fn yaml<T: DeserializeOwned + Send + 'static>(
    path: impl AsRef<Path>,
    options: YamlOptions,
) -> Result<impl Stream<Item = Result<T, ReadError>> + Send, ReadError> {
    let token = options.common.cancellation.clone();
    let iter = yaml_sync(path, options)?;
    Ok(unify::iter_stream(iter, YIELD_THRESHOLD).with_cancellation(token))
}
