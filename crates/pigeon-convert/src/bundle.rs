use pigeon_pack::{ExportMode, PackDocument, PackOptions, PackReport, pack};

use crate::converter::ConversionResult;

/// Results of a batch together with how they should be packaged.
#[derive(Debug)]
pub struct ExportBundle {
    pub results: Vec<ConversionResult>,
    pub mode: ExportMode,
}

impl ExportBundle {
    #[must_use]
    pub fn new(results: Vec<ConversionResult>, mode: ExportMode) -> Self {
        Self { results, mode }
    }

    /// Number of documents that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|result| !result.is_success()).count()
    }

    /// Package every successful document according to the bundle's mode.
    ///
    /// Failed documents are left out of all archives.
    #[must_use]
    pub fn pack(&self, options: &PackOptions) -> PackReport {
        let documents: Vec<PackDocument> = self
            .results
            .iter()
            .filter_map(|result| {
                let html = result.output_html.clone()?;
                result.is_success().then(|| PackDocument {
                    name: result.name.clone(),
                    html,
                    assets: result.asset_folder.clone(),
                })
            })
            .collect();
        pack(&documents, self.mode, options)
    }
}
