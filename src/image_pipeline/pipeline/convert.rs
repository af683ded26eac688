use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use super::session::Session;
use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::common::timing::PipelineTimings;
use crate::image_pipeline::config::Configuration;
use crate::image_pipeline::lens::LensDatabase;
use crate::image_pipeline::raw::{RawImageReader, RawLoaderReader};
use crate::image_pipeline::tiff::{StandardTiffWriter, TiffWriter};
use crate::image_pipeline::white_balance::PresetTable;

/// What a batch conversion produced besides the file.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub width: usize,
    pub height: usize,
    pub warnings: Vec<String>,
    pub timings: PipelineTimings,
}

/// One-shot raw to TIFF conversion: decode, run every phase, encode.
pub struct RawConverter<R: RawImageReader + Clone, W: TiffWriter> {
    reader: R,
    writer: W,
    config: Configuration,
    presets: PresetTable,
    lens_database: Option<Arc<dyn LensDatabase>>,
}

impl RawConverter<RawLoaderReader, StandardTiffWriter> {
    pub fn new(config: Configuration) -> Self {
        Self::with_custom(RawLoaderReader, StandardTiffWriter, config)
    }
}

impl<R: RawImageReader + Clone, W: TiffWriter> RawConverter<R, W> {
    pub fn with_custom(reader: R, writer: W, config: Configuration) -> Self {
        Self {
            reader,
            writer,
            config,
            presets: PresetTable::default(),
            lens_database: None,
        }
    }

    pub fn with_presets(mut self, presets: PresetTable) -> Self {
        self.presets = presets;
        self
    }

    pub fn with_lens_database(mut self, database: Arc<dyn LensDatabase>) -> Self {
        self.lens_database = Some(database);
        self
    }

    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<ConversionReport> {
        info!("Starting raw conversion");

        let frame = {
            let _span = tracing::info_span!("decode_raw").entered();
            self.reader.read_raw(input_data)?
        };

        let mut session = Session::from_frame(self.reader.clone(), frame, self.config.clone())?
            .with_presets(self.presets.clone());
        if let Some(database) = &self.lens_database {
            session = session.with_lens_database(Arc::clone(database));
        }

        let image = {
            let _span = tracing::info_span!("develop").entered();
            session.render()?
        };

        {
            let _span = tracing::info_span!(
                "encode_tiff",
                width = image.width(),
                height = image.height()
            )
            .entered();
            self.writer.write_tiff(&image, output, &self.config.tiff)?;
        }

        info!(
            width = image.width(),
            height = image.height(),
            bits = image.bits_per_sample(),
            "Conversion complete"
        );
        Ok(ConversionReport {
            width: image.width(),
            height: image.height(),
            warnings: session.take_warnings(),
            timings: session.take_timings(),
        })
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<ConversionReport> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                PipelineError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        let mut output_file = {
            let _span = tracing::info_span!("create_output_file").entered();
            std::fs::File::create(output_path).map_err(|e| {
                PipelineError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?
        };

        self.convert(&input_data, &mut output_file)
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn set_config(&mut self, config: Configuration) {
        self.config = config;
    }
}
