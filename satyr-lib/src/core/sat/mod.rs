/*!

The CDCL SAT core: a packed clause pool, watched-literal propagation, first-UIP conflict
analysis, activity-driven branching, and Luby restarts.

Boolean variables are integers; variable 0 is reserved and permanently true, so literals
0 and 1 denote `true` and `false`. Unit clauses live on the assignment stack, binary
clauses are inlined in the watch vectors, and everything else sits in the pool.

*/

mod clause_pool;
mod heap;
mod literal;
mod solver;
mod watch;

pub use clause_pool::{Cidx, ClausePool};
pub use literal::{AnteTag, BVal, BVar, Lit, FALSE_LIT, TRUE_LIT};
pub use solver::{SatSolver, SearchParams, SolverStats, SolverStatus};
pub use watch::Watch;
