//! Vector print documents built with `genpdf`.

use genpdf::{Margins, SimplePageDecorator, Size};
use log::debug;

use crate::elements::SurfaceElement;
use crate::error::Result;
use crate::fonts;
use crate::surface::Surface;

/// Builder for `genpdf::Document` instances with label defaults.
#[derive(Default)]
pub struct DocumentBuilder {
    title: Option<String>,
    paper_size: Option<Size>,
    margins: Option<Margins>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the document title written to the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the paper size used for newly created documents.
    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = Some(paper_size.into());
        self
    }

    /// Sets the page margins.
    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = Some(margins.into());
        self
    }

    /// Builds a `genpdf::Document` with the default label font family.
    pub fn build(self) -> Result<genpdf::Document> {
        let font_family = fonts::default_font_family()?;
        let mut document = genpdf::Document::new(font_family);

        if let Some(title) = self.title {
            document.set_title(title);
        }
        if let Some(paper_size) = self.paper_size {
            document.set_paper_size(paper_size);
        }

        let mut decorator = SimplePageDecorator::new();
        if let Some(margins) = self.margins {
            decorator.set_margins(margins);
        }
        document.set_page_decorator(decorator);

        Ok(document)
    }
}

/// Renders `surface` into a one-page vector PDF the size of the label.
pub fn render_surface_pdf(surface: &Surface) -> Result<Vec<u8>> {
    let size = Size::new(
        genpdf::Mm::from(printpdf::Mm(surface.width_mm())),
        genpdf::Mm::from(printpdf::Mm(surface.height_mm())),
    );
    let mut document = DocumentBuilder::new()
        .with_title(surface.title())
        .with_paper_size(size)
        .with_margins(Margins::all(0))
        .build()?;
    document.push(SurfaceElement::new(surface.clone()));

    let mut bytes = Vec::new();
    document.render(&mut bytes)?;
    debug!("Rendered vector document '{}' ({} bytes)", surface.title(), bytes.len());
    Ok(bytes)
}
