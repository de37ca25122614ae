//! `skip` / `limit` query parameters.

use crate::error::AppError;

/// Normalized paging window: skip >= 0, limit > 0 when present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Pagination {
    /// Everything from the first record; used after delete-all.
    pub fn unbounded() -> Self {
        Pagination { skip: 0, limit: None }
    }

    /// Parse raw `skip` and `limit`. With a `max_limit`, limit defaults to it and may not exceed it.
    pub fn parse(skip: Option<&str>, limit: Option<&str>, max_limit: Option<u64>) -> Result<Self, AppError> {
        let skip = match skip.map(str::trim).filter(|s| !s.is_empty()) {
            None => 0,
            Some(s) => {
                let n: i64 = s
                    .parse()
                    .map_err(|_| AppError::BadRequest("skip query parameter must be an integer".into()))?;
                if n < 0 {
                    return Err(AppError::BadRequest(
                        "skip query parameter must be greater or equal to zero".into(),
                    ));
                }
                n as u64
            }
        };
        let limit = match limit.map(str::trim).filter(|s| !s.is_empty()) {
            None => max_limit,
            Some(s) => {
                let n: i64 = s
                    .parse()
                    .map_err(|_| AppError::BadRequest("limit query parameter must be an integer".into()))?;
                if n <= 0 {
                    return Err(AppError::BadRequest(
                        "limit query parameter must be greater than zero".into(),
                    ));
                }
                let n = n as u64;
                if let Some(max) = max_limit {
                    if n > max {
                        return Err(AppError::BadRequest(format!(
                            "limit query parameter must be less than or equal to {}",
                            max
                        )));
                    }
                }
                Some(n)
            }
        };
        Ok(Pagination { skip, limit })
    }

    /// `Content-Range` value for a page of `returned` items out of `total`.
    /// An empty page yields `{skip}-{skip-1}/{total}`.
    pub fn content_range(&self, returned: usize, total: u64) -> String {
        let skip = self.skip as i64;
        format!("{}-{}/{}", skip, skip + returned as i64 - 1, total)
    }
}
