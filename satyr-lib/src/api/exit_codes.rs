/*!

Process exit codes shared with front ends. These are contract constants: scripts that
drive a solver binary match on the numeric values.

*/

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_USAGE: i32 = 16;
pub const EXIT_FILE_NOT_FOUND: i32 = 17;
pub const EXIT_INTERRUPTED: i32 = 40;
pub const EXIT_OUT_OF_MEMORY: i32 = 48;
