// Downward operations called by the host, grouped by resource kind

mod discoverer;
mod engine;
mod media;
mod player;
mod renderer;
