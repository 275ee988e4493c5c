/*!
 * Process Module
 * Process entities, thread execution contexts and the process table
 */

pub mod table;
pub mod types;

pub use table::ProcessTable;
pub use types::{PolicyView, Process, ThreadContext};
