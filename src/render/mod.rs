pub mod svg;

pub use svg::SvgSurface;
