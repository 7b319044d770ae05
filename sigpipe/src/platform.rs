/// Board runtime brought up before the pipeline and serviced from the
/// cooperative loop.
///
/// The pipeline relies only on call order: [`setup()`](Platform::setup) once
/// before any session starts, then [`tick()`](Platform::tick) once per loop
/// iteration, after the pipeline's own `tick()`.
pub trait Platform {
    fn setup(&mut self);

    fn tick(&mut self);
}
