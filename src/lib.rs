/*!
Smoothed particle hydrodynamics for a single fluid inside an axis-aligned box.

The solver consumes a fixed-size particle array and a parameter set and
advances it by one fixed time step per call of [`FluidSimulation::single_step`].
Both execution strategies (scalar and parallel-batch) share the same kernels
and pass functions.
*/

mod simulation;

pub use simulation::*;
