use crate::models::{RatingRecord, RawRatingRow, RATING_BUCKETS};

/// Outcome of cleaning the raw ratings table
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRatings {
    pub records: Vec<RatingRecord>,
    /// Rows discarded because a required value was missing or malformed
    pub dropped: usize,
}

/// Coerces a text cell to a number. Blank, unparseable and `NaN` cells are missing.
fn parse_numeric(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| !value.is_nan())
}

/// The overall rating only has to be present; its value is not used.
fn is_missing(cell: Option<&str>) -> bool {
    match cell.map(str::trim) {
        None => true,
        Some(value) => value.is_empty() || value.eq_ignore_ascii_case("nan"),
    }
}

/// Cleans one row, returning `None` if it must be dropped
fn clean_row(row: RawRatingRow) -> Option<RatingRecord> {
    if is_missing(row.rating.as_deref()) {
        return None;
    }

    let mut distribution = [0.0; RATING_BUCKETS];
    for (slot, cell) in distribution.iter_mut().zip(row.distribution()) {
        *slot = parse_numeric(cell)?;
    }

    let name = row.name.filter(|name| !name.trim().is_empty())?;

    Some(RatingRecord {
        name,
        genre: row.genre.map(|genre| genre.to_lowercase()),
        average_rating: distribution.iter().sum::<f64>() / RATING_BUCKETS as f64,
        rating_distribution: distribution,
    })
}

/// Cleans the raw table, keeping source order.
///
/// A row survives only if its overall rating is present and all five
/// distribution buckets are numeric. Genres are lower-cased for matching.
pub fn clean(rows: Vec<RawRatingRow>) -> CleanedRatings {
    let total = rows.len();
    let records: Vec<RatingRecord> = rows.into_iter().filter_map(clean_row).collect();

    CleanedRatings {
        dropped: total - records.len(),
        records,
    }
}
