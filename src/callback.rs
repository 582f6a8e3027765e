use std::future::Future;

use crate::error::LincsError;

/// Runs `operation` and, if a callback is given, hands it the outcome before
/// returning that same outcome to the caller. The callback runs at most once.
///
/// ```ignore
/// let rows = nodeify(lincs.get(["5"], "metadata.det_plate"), Some(|result: Result<&Vec<Row>, &LincsError>| {
///     if let Err(err) = result {
///         eprintln!("lookup failed: {err}");
///     }
/// }))
/// .await?;
/// ```
pub async fn nodeify<T, Fut, F>(operation: Fut, callback: Option<F>) -> Result<T, LincsError>
where
    Fut: Future<Output = Result<T, LincsError>>,
    F: FnOnce(Result<&T, &LincsError>),
{
    let result = operation.await;
    if let Some(callback) = callback {
        callback(result.as_ref());
    }
    result
}
