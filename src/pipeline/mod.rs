//! The conversion orchestrator: a small state machine over five stages.
//!
//! ## Data Flow
//!
//! ```text
//! inputs ──▶ Render ──▶ Merge ──▶ FormatConvert ──▶ Rasterize ──▶ Finalize
//!            (N → N)   (N → 1)   (1 → 1 | N → N)    (1 → images + data.json)
//! ```
//!
//! Stages always run in this order. Each has a named entry guard
//! ([`should_merge`], [`should_reformat`], [`should_rasterize`]); a stage
//! whose guard does not hold is skipped and the active artifact set passes
//! through unchanged. The first failing stage aborts the run and no artifacts
//! are reported.
//!
//! 1. [`render`] — every input through the renderer, bounded parallelism,
//!    index-addressed results
//! 2. [`merge`]  — concatenate the rendered PDFs in input order
//! 3. [`format`] — apply the target PDF profile after the fact
//! 4. [`raster`] — page images of the single PDF plus slide metadata

pub mod format;
pub mod merge;
pub mod raster;
pub mod render;

use crate::adapters::Adapters;
use crate::artifact::{Artifact, ArtifactRole, ConversionOutput, ConversionStats};
use crate::config::{EngineConfig, OptionSet};
use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use crate::staging::Staging;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Render,
    Merge,
    FormatConvert,
    Rasterize,
    Finalize,
}

impl Stage {
    /// Every stage in execution order.
    pub const ORDER: [Stage; 5] = [
        Stage::Render,
        Stage::Merge,
        Stage::FormatConvert,
        Stage::Rasterize,
        Stage::Finalize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Render => "render",
            Stage::Merge => "merge",
            Stage::FormatConvert => "formatConvert",
            Stage::Rasterize => "rasterize",
            Stage::Finalize => "finalize",
        }
    }

    /// Entry guard: whether this stage runs given the options and the
    /// artifacts produced so far.
    pub fn should_enter(&self, options: &OptionSet, active: &[Artifact]) -> bool {
        match self {
            Stage::Render | Stage::Finalize => true,
            Stage::Merge => should_merge(options, active),
            Stage::FormatConvert => should_reformat(options),
            Stage::Rasterize => should_rasterize(options),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merge only when asked to and there is more than one PDF to combine.
pub fn should_merge(options: &OptionSet, active: &[Artifact]) -> bool {
    options.merge() && active.len() > 1
}

/// Post-hoc conversion only when a target format is set and the renderer
/// did not already apply it.
pub fn should_reformat(options: &OptionSet) -> bool {
    options.post_format().is_some()
}

pub fn should_rasterize(options: &OptionSet) -> bool {
    options.rasterize()
}

/// Runs conversions against one set of adapters.
///
/// A `Pipeline` holds no per-request state; the same value can drive any
/// number of concurrent [`run`](Pipeline::run)s, each with its own
/// [`Staging`] area.
#[derive(Clone)]
pub struct Pipeline {
    adapters: Adapters,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    pub fn new(adapters: Adapters) -> Self {
        Self {
            adapters,
            progress: None,
        }
    }

    /// A pipeline driving the command-line tools described by `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Adapters::from_config(config))
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn adapters(&self) -> &Adapters {
        &self.adapters
    }

    /// Execute every stage whose guard holds, writing into `staging`.
    ///
    /// Returned artifact paths live inside `staging` and disappear with it.
    ///
    /// # Errors
    /// The first stage failure, unchanged. Nothing produced before it is
    /// reported.
    pub async fn run(
        &self,
        options: &OptionSet,
        staging: &Staging,
    ) -> Result<ConversionOutput, ConvertError> {
        let total_start = Instant::now();
        info!("Starting pipeline for {} input(s)", options.inputs().len());
        if let Some(ref cb) = self.progress {
            cb.on_pipeline_start(options.inputs());
        }

        let mut stats = ConversionStats::default();
        let mut active: Vec<Artifact> = Vec::new();

        for stage in Stage::ORDER {
            if !stage.should_enter(options, &active) {
                debug!("Skipping stage {}", stage);
                continue;
            }
            if let Some(ref cb) = self.progress {
                cb.on_stage_start(stage);
            }
            stats.stages.push(stage);
            let stage_start = Instant::now();

            active = match stage {
                Stage::Render => {
                    let rendered =
                        render::render_all(self.adapters.renderer.as_ref(), options, staging)
                            .await?;
                    stats.render_calls = rendered.len();
                    stats.render_duration_ms = elapsed_ms(stage_start);
                    rendered
                }
                Stage::Merge => {
                    let merged =
                        merge::merge_all(self.adapters.engine.as_ref(), &active, staging).await?;
                    stats.merge_calls = 1;
                    stats.merge_duration_ms = elapsed_ms(stage_start);
                    vec![merged]
                }
                Stage::FormatConvert => {
                    let format = options.post_format().ok_or_else(|| {
                        ConvertError::Internal("format stage entered without a format".into())
                    })?;
                    let converted = format::reformat_all(
                        self.adapters.engine.as_ref(),
                        format,
                        &active,
                        options.concurrency(),
                        staging,
                    )
                    .await?;
                    stats.format_calls = converted.len();
                    stats.format_duration_ms = elapsed_ms(stage_start);
                    converted
                }
                Stage::Rasterize => {
                    let produced = raster::rasterize(&self.adapters, options, &active, staging)
                        .await?;
                    stats.raster_calls = 1;
                    stats.metadata_calls = 1;
                    stats.raster_duration_ms = elapsed_ms(stage_start);
                    produced
                }
                Stage::Finalize => active,
            };

            info!(
                "Stage {} produced {} artifact(s) in {}ms",
                stage,
                active.len(),
                elapsed_ms(stage_start)
            );
            if let Some(ref cb) = self.progress {
                cb.on_stage_complete(stage, &active);
            }
        }

        stats.total_duration_ms = elapsed_ms(total_start);
        info!(
            "Pipeline complete: {} artifact(s), {}ms total",
            active.len(),
            stats.total_duration_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_pipeline_complete(&active);
        }

        Ok(ConversionOutput {
            artifacts: active,
            stats,
        })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("adapters", &self.adapters)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Run `call` over `items` with at most `concurrency` calls in flight.
///
/// Results land in the slot of the item that produced them, so the output
/// order is the input order whatever the completion order. The first error
/// is returned at once; dropping the stream cancels the calls still running.
async fn fan_out<'a, T, F, Fut>(
    items: &'a [T],
    concurrency: usize,
    role: ArtifactRole,
    call: F,
) -> Result<Vec<Artifact>, ConvertError>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = Result<PathBuf, ConvertError>>,
{
    let mut slots: Vec<Option<PathBuf>> = vec![None; items.len()];
    let mut results = stream::iter(items.iter().enumerate())
        .map(|(idx, item)| {
            let pending = call(item);
            async move { pending.await.map(|path| (idx, path)) }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some(result) = results.next().await {
        let (idx, path) = result?;
        slots[idx] = Some(path);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.map(|path| Artifact::new(path, role))
                .ok_or_else(|| ConvertError::Internal(format!("no result for item {idx}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        MockDocumentRenderer, MockMetadataExtractor, MockPdfEngine, MockRasterizer,
    };
    use crate::artifact::ArtifactRole;
    use crate::config::PdfFormat;
    use crate::error::AdapterError;
    use crate::progress::PipelineProgressCallback;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    fn options(inputs: &[&str]) -> crate::config::OptionSetBuilder {
        OptionSet::builder().inputs(inputs.iter().copied())
    }

    /// A renderer that writes a placeholder PDF at whatever path it is given.
    fn writing_renderer(times: usize) -> MockDocumentRenderer {
        let mut renderer = MockDocumentRenderer::new();
        renderer
            .expect_render()
            .times(times)
            .returning(|_, output, _| {
                std::fs::write(output, b"%PDF-1.7").map_err(AdapterError::from)
            });
        renderer
    }

    fn adapters(
        renderer: MockDocumentRenderer,
        engine: MockPdfEngine,
        rasterizer: MockRasterizer,
        metadata: MockMetadataExtractor,
    ) -> Adapters {
        Adapters {
            renderer: Arc::new(renderer),
            engine: Arc::new(engine),
            rasterizer: Arc::new(rasterizer),
            metadata: Arc::new(metadata),
        }
    }

    fn untouched_engine() -> MockPdfEngine {
        let mut engine = MockPdfEngine::new();
        engine.expect_merge().times(0);
        engine.expect_convert().times(0);
        engine
    }

    fn untouched_rasterizer() -> MockRasterizer {
        let mut r = MockRasterizer::new();
        r.expect_rasterize().times(0);
        r
    }

    fn untouched_metadata() -> MockMetadataExtractor {
        let mut m = MockMetadataExtractor::new();
        m.expect_extract().times(0);
        m
    }

    // ── Guards ───────────────────────────────────────────────────────────

    #[test]
    fn merge_guard_needs_flag_and_several_artifacts() {
        let one = [Artifact::new("a.pdf", ArtifactRole::Rendered)];
        let two = [
            Artifact::new("a.pdf", ArtifactRole::Rendered),
            Artifact::new("b.pdf", ArtifactRole::Rendered),
        ];
        let merging = options(&["a.docx"]).merge(true).build().unwrap();
        let plain = options(&["a.docx"]).build().unwrap();

        assert!(!should_merge(&merging, &one));
        assert!(should_merge(&merging, &two));
        assert!(!should_merge(&plain, &two));
    }

    #[test]
    fn reformat_guard_only_for_post_hoc_format() {
        let native = options(&["a.docx"])
            .target_format(Some(PdfFormat::PdfA1b))
            .build()
            .unwrap();
        let post = options(&["a.docx"])
            .target_format(Some(PdfFormat::PdfA1b))
            .apply_format_natively(false)
            .build()
            .unwrap();
        let none = options(&["a.docx"]).apply_format_natively(false).build().unwrap();

        assert!(!should_reformat(&native));
        assert!(should_reformat(&post));
        assert!(!should_reformat(&none));
    }

    #[test]
    fn render_and_finalize_always_enter() {
        let opts = options(&["a.docx"]).build().unwrap();
        assert!(Stage::Render.should_enter(&opts, &[]));
        assert!(Stage::Finalize.should_enter(&opts, &[]));
        assert!(!Stage::Rasterize.should_enter(&opts, &[]));
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::FormatConvert.to_string(), "formatConvert");
        assert_eq!(
            serde_json::to_string(&Stage::FormatConvert).unwrap(),
            "\"formatConvert\""
        );
    }

    // ── Runs ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn single_input_yields_single_rendered_pdf() {
        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx"]).build().unwrap();
        let pipeline = Pipeline::new(adapters(
            writing_renderer(1),
            untouched_engine(),
            untouched_rasterizer(),
            untouched_metadata(),
        ));

        let out = pipeline.run(&opts, &staging).await.unwrap();
        assert_eq!(out.artifacts.len(), 1);
        assert_eq!(out.artifacts[0].role, ArtifactRole::Rendered);
        assert!(out.artifacts[0].path.starts_with(staging.path()));
        assert!(out.artifacts[0].path.exists());
        assert_eq!(out.stats.stages, vec![Stage::Render, Stage::Finalize]);
        assert_eq!(out.stats.render_calls, 1);
    }

    #[tokio::test]
    async fn render_options_reach_the_renderer() {
        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx"])
            .landscape(true)
            .page_ranges("1-3")
            .target_format(Some(PdfFormat::PdfA2b))
            .build()
            .unwrap();

        let mut renderer = MockDocumentRenderer::new();
        renderer
            .expect_render()
            .withf(|input, _, o| {
                input == Path::new("a.docx")
                    && o.landscape
                    && o.page_ranges == "1-3"
                    && o.format == Some(PdfFormat::PdfA2b)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let pipeline = Pipeline::new(adapters(
            renderer,
            untouched_engine(),
            untouched_rasterizer(),
            untouched_metadata(),
        ));

        pipeline.run(&opts, &staging).await.unwrap();
    }

    #[tokio::test]
    async fn several_inputs_merge_into_one_pdf_in_input_order() {
        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx", "b.xlsx", "c.pptx"]).merge(true).build().unwrap();

        let rendered: Arc<Mutex<Vec<(PathBuf, PathBuf)>>> = Arc::default();
        let seen = Arc::clone(&rendered);
        let mut renderer = MockDocumentRenderer::new();
        renderer.expect_render().times(3).returning(move |input, output, _| {
            seen.lock().unwrap().push((input.to_path_buf(), output.to_path_buf()));
            Ok(())
        });

        let expected = Arc::clone(&rendered);
        let mut engine = MockPdfEngine::new();
        engine
            .expect_merge()
            .times(1)
            .withf(move |inputs, _| {
                let rendered = expected.lock().unwrap();
                let by_input = |name: &str| {
                    rendered
                        .iter()
                        .find(|(input, _)| input == Path::new(name))
                        .map(|(_, o)| o.clone())
                };
                inputs.len() == 3
                    && Some(inputs[0].clone()) == by_input("a.docx")
                    && Some(inputs[1].clone()) == by_input("b.xlsx")
                    && Some(inputs[2].clone()) == by_input("c.pptx")
            })
            .returning(|_, _| Ok(()));
        engine.expect_convert().times(0);

        let pipeline = Pipeline::new(adapters(
            renderer,
            engine,
            untouched_rasterizer(),
            untouched_metadata(),
        ));
        let out = pipeline.run(&opts, &staging).await.unwrap();

        assert_eq!(out.artifacts.len(), 1);
        assert_eq!(out.artifacts[0].role, ArtifactRole::Merged);
        assert_eq!(out.stats.merge_calls, 1);
        assert_eq!(
            out.stats.stages,
            vec![Stage::Render, Stage::Merge, Stage::Finalize]
        );
    }

    #[tokio::test]
    async fn single_input_with_merge_never_calls_merge() {
        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx"])
            .merge(true)
            .target_format(Some(PdfFormat::PdfA1b))
            .apply_format_natively(false)
            .build()
            .unwrap();

        let mut engine = MockPdfEngine::new();
        engine.expect_merge().times(0);
        engine
            .expect_convert()
            .times(1)
            .withf(|format, _, _| *format == PdfFormat::PdfA1b)
            .returning(|_, _, _| Ok(()));

        let pipeline = Pipeline::new(adapters(
            writing_renderer(1),
            engine,
            untouched_rasterizer(),
            untouched_metadata(),
        ));
        let out = pipeline.run(&opts, &staging).await.unwrap();

        assert_eq!(out.artifacts.len(), 1);
        assert_eq!(out.artifacts[0].role, ArtifactRole::Reformatted);
        assert_eq!(out.stats.merge_calls, 0);
        assert!(!out.stats.stages.contains(&Stage::Merge));
    }

    #[tokio::test]
    async fn post_hoc_format_fans_out_preserving_positions() {
        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx", "b.docx", "c.docx"])
            .target_format(Some(PdfFormat::PdfA3b))
            .apply_format_natively(false)
            .concurrency(3)
            .build()
            .unwrap();

        let rendered: Arc<Mutex<Vec<(PathBuf, PathBuf)>>> = Arc::default();
        let seen = Arc::clone(&rendered);
        let mut renderer = MockDocumentRenderer::new();
        renderer.expect_render().times(3).returning(move |input, output, o| {
            assert_eq!(o.format, None, "format must not be applied natively");
            seen.lock().unwrap().push((input.to_path_buf(), output.to_path_buf()));
            Ok(())
        });

        let converted: Arc<Mutex<Vec<(PathBuf, PathBuf)>>> = Arc::default();
        let conv = Arc::clone(&converted);
        let mut engine = MockPdfEngine::new();
        engine.expect_merge().times(0);
        engine.expect_convert().times(3).returning(move |_, input, output| {
            conv.lock().unwrap().push((input.to_path_buf(), output.to_path_buf()));
            Ok(())
        });

        let pipeline = Pipeline::new(adapters(
            renderer,
            engine,
            untouched_rasterizer(),
            untouched_metadata(),
        ));
        let out = pipeline.run(&opts, &staging).await.unwrap();

        assert_eq!(out.stats.format_calls, 3);
        assert_eq!(out.artifacts.len(), 3);
        let rendered = rendered.lock().unwrap();
        let converted = converted.lock().unwrap();
        for (i, name) in ["a.docx", "b.docx", "c.docx"].iter().enumerate() {
            let (_, rendered_pdf) = rendered
                .iter()
                .find(|(input, _)| input == Path::new(name))
                .unwrap();
            let (_, reformatted) = converted
                .iter()
                .find(|(input, _)| input == rendered_pdf)
                .unwrap();
            assert_eq!(&out.artifacts[i].path, reformatted);
            assert_eq!(out.artifacts[i].role, ArtifactRole::Reformatted);
        }
    }

    #[tokio::test]
    async fn rasterize_returns_images_then_metadata() {
        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx"])
            .rasterize(true)
            .raster_density("150")
            .raster_quality("90")
            .raster_resize("75%")
            .build()
            .unwrap();

        let mut rasterizer = MockRasterizer::new();
        rasterizer
            .expect_rasterize()
            .times(1)
            .withf(|_, o, _| o.density == "150" && o.quality == "90" && o.resize == "75%")
            .returning(|_, _, out_dir| {
                for name in ["slide-1.jpg", "slide-0.jpg", "slide-2.jpg"] {
                    std::fs::write(out_dir.join(name), b"jpg")?;
                }
                std::fs::create_dir(out_dir.join("nested"))?;
                Ok(())
            });

        let mut metadata = MockMetadataExtractor::new();
        metadata
            .expect_extract()
            .times(1)
            .withf(|document, _| document == Path::new("a.docx"))
            .returning(|_, out_dir| {
                let path = out_dir.join("data.json");
                std::fs::write(&path, b"{}")?;
                Ok(path)
            });

        let pipeline = Pipeline::new(adapters(
            writing_renderer(1),
            untouched_engine(),
            rasterizer,
            metadata,
        ));
        let out = pipeline.run(&opts, &staging).await.unwrap();

        let names: Vec<String> = out
            .artifacts
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["slide-0.jpg", "slide-1.jpg", "slide-2.jpg", "data.json"]
        );
        assert!(out.artifacts[..3]
            .iter()
            .all(|a| a.role == ArtifactRole::RasterImage));
        assert_eq!(out.artifacts[3].role, ArtifactRole::Metadata);
        assert_eq!(out.stats.raster_calls, 1);
        assert_eq!(out.stats.metadata_calls, 1);
    }

    #[tokio::test]
    async fn malformed_page_ranges_are_a_client_error() {
        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx"]).page_ranges("5-2").build().unwrap();

        let mut renderer = MockDocumentRenderer::new();
        renderer
            .expect_render()
            .returning(|_, _, o| Err(AdapterError::MalformedPageRanges(o.page_ranges.clone())));
        let pipeline = Pipeline::new(adapters(
            renderer,
            untouched_engine(),
            untouched_rasterizer(),
            untouched_metadata(),
        ));

        let err = pipeline.run(&opts, &staging).await.unwrap_err();
        assert!(
            matches!(err, ConvertError::MalformedPageRanges { ref ranges, field: "nativePageRanges" } if ranges == "5-2"),
            "got: {err:?}"
        );
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn unsupported_native_and_post_hoc_formats_are_distinguished() {
        let staging = Staging::new().unwrap();

        let native = options(&["a.docx"])
            .target_format(Some(PdfFormat::PdfUa1))
            .build()
            .unwrap();
        let mut renderer = MockDocumentRenderer::new();
        renderer
            .expect_render()
            .returning(|_, _, _| Err(AdapterError::FormatNotAvailable("PDF/UA-1".into())));
        let pipeline = Pipeline::new(adapters(
            renderer,
            untouched_engine(),
            untouched_rasterizer(),
            untouched_metadata(),
        ));
        let err = pipeline.run(&native, &staging).await.unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedFormat { field: "nativePdfFormat", .. }
        ));

        let post = options(&["a.docx"])
            .target_format(Some(PdfFormat::PdfA1a))
            .apply_format_natively(false)
            .build()
            .unwrap();
        let mut engine = MockPdfEngine::new();
        engine
            .expect_convert()
            .returning(|f, _, _| Err(AdapterError::FormatNotAvailable(f.to_string())));
        let pipeline = Pipeline::new(adapters(
            writing_renderer(1),
            engine,
            untouched_rasterizer(),
            untouched_metadata(),
        ));
        let err = pipeline.run(&post, &staging).await.unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedFormat { ref format, field: "pdfFormat" } if format == "PDF/A-1a"
        ));
    }

    #[tokio::test]
    async fn generic_failures_are_server_errors_and_stop_the_run() {
        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx", "b.docx"]).merge(true).rasterize(false).build().unwrap();

        let mut engine = MockPdfEngine::new();
        engine.expect_merge().times(1).returning(|_, _| {
            Err(AdapterError::CommandFailed {
                program: "qpdf".into(),
                code: Some(2),
                stderr: "damaged".into(),
            })
        });
        engine.expect_convert().times(0);

        let pipeline = Pipeline::new(adapters(
            writing_renderer(2),
            engine,
            untouched_rasterizer(),
            untouched_metadata(),
        ));
        let err = pipeline.run(&opts, &staging).await.unwrap_err();
        assert!(matches!(err, ConvertError::MergeFailed(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Internal Server Error");
    }

    #[tokio::test]
    async fn metadata_failure_is_distinct_from_rasterization_failure() {
        let staging = Staging::new().unwrap();
        let opts = options(&["deck.pptx"]).rasterize(true).build().unwrap();

        let mut rasterizer = MockRasterizer::new();
        rasterizer.expect_rasterize().returning(|_, _, _| Ok(()));
        let mut metadata = MockMetadataExtractor::new();
        metadata.expect_extract().returning(|doc, _| {
            Err(AdapterError::Invalid {
                path: doc.to_path_buf(),
                detail: "broken zip".into(),
            })
        });
        let pipeline = Pipeline::new(adapters(
            writing_renderer(1),
            untouched_engine(),
            rasterizer,
            metadata,
        ));
        let err = pipeline.run(&opts, &staging).await.unwrap_err();
        assert!(matches!(err, ConvertError::MetadataExtractionFailed(_)));

        let mut rasterizer = MockRasterizer::new();
        rasterizer.expect_rasterize().returning(|_, _, _| {
            Err(AdapterError::Timeout {
                program: "convert".into(),
                secs: 1,
            })
        });
        let pipeline = Pipeline::new(adapters(
            writing_renderer(1),
            untouched_engine(),
            rasterizer,
            untouched_metadata(),
        ));
        let err = pipeline.run(&opts, &staging).await.unwrap_err();
        assert!(matches!(err, ConvertError::RasterizationFailed(_)));
    }

    #[tokio::test]
    async fn progress_events_follow_entered_stages() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<String>>);
        impl PipelineProgressCallback for Recorder {
            fn on_pipeline_start(&self, inputs: &[PathBuf]) {
                self.0.lock().unwrap().push(format!("start:{}", inputs.len()));
            }
            fn on_stage_start(&self, stage: Stage) {
                self.0.lock().unwrap().push(format!("enter:{stage}"));
            }
            fn on_stage_complete(&self, stage: Stage, artifacts: &[Artifact]) {
                self.0
                    .lock()
                    .unwrap()
                    .push(format!("done:{stage}:{}", artifacts.len()));
            }
            fn on_pipeline_complete(&self, artifacts: &[Artifact]) {
                self.0.lock().unwrap().push(format!("end:{}", artifacts.len()));
            }
        }

        let staging = Staging::new().unwrap();
        let opts = options(&["a.docx", "b.docx"]).build().unwrap();
        let recorder = Arc::new(Recorder::default());
        let pipeline = Pipeline::new(adapters(
            writing_renderer(2),
            untouched_engine(),
            untouched_rasterizer(),
            untouched_metadata(),
        ))
        .with_progress(recorder.clone());

        pipeline.run(&opts, &staging).await.unwrap();
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                "start:2",
                "enter:render",
                "done:render:2",
                "enter:finalize",
                "done:finalize:2",
                "end:2"
            ]
        );
    }
}
