pub mod appointment;
pub mod confirmation;
pub mod driver_pool;
pub mod inventory;
pub mod lifecycle;

use caresync_core::errors::CoordError;

pub(crate) fn db_err(e: sqlx::Error) -> CoordError {
    CoordError::Database(e.into())
}
