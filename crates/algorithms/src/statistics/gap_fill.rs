//! Gap filling of per-polygon results
//!
//! Polygons without a value borrow one from their neighbours in table
//! order: first the nearest preceding value, then (for a leading run of
//! gaps) the nearest following value. This follows the order the
//! polygons were supplied in and is not a spatial interpolation.

use super::table::{ValueOrigin, ZonalTable};
use tracing::{debug, warn};

/// Fill absent rows from their neighbours.
///
/// Never fails. A table where every row is absent comes back unchanged;
/// [`ZonalTable::into_complete`] reports that case.
pub fn fill_gaps(mut table: ZonalTable) -> ZonalTable {
    let rows = table.rows_mut();

    let mut last = None;
    let mut forward = 0usize;
    for row in rows.iter_mut() {
        match row.value {
            Some(value) => last = Some(value),
            None => {
                if let Some(value) = last {
                    row.value = Some(value);
                    row.origin = ValueOrigin::ForwardFilled;
                    forward += 1;
                    debug!(id = %row.id, value, "Forward-filled polygon");
                }
            }
        }
    }

    // Only a leading run of gaps can survive the forward pass
    let mut backward = 0usize;
    if let Some(first) = rows.iter().position(|row| row.value.is_some()) {
        let value = rows[first].value;
        for row in rows[..first].iter_mut() {
            row.value = value;
            row.origin = ValueOrigin::BackwardFilled;
            backward += 1;
            debug!(id = %row.id, value = ?value, "Backward-filled polygon");
        }
    }

    if forward + backward > 0 {
        warn!(forward, backward, "Filled polygons without a value from neighbouring rows");
    }

    table
}
