//! Render stage: every input document to its own PDF.
//!
//! Renderer calls run with bounded parallelism (`OptionSet::concurrency`).
//! Each result is stored under the index of its input, so artifact `i`
//! always belongs to input `i`.

use super::fan_out;
use crate::adapters::DocumentRenderer;
use crate::artifact::{Artifact, ArtifactRole};
use crate::config::OptionSet;
use crate::error::{AdapterError, ConvertError};
use crate::staging::Staging;
use std::path::Path;
use tracing::debug;

/// Render all inputs, in input order.
pub async fn render_all(
    renderer: &dyn DocumentRenderer,
    options: &OptionSet,
    staging: &Staging,
) -> Result<Vec<Artifact>, ConvertError> {
    let render_options = options.render_options();
    let render_options = &render_options;
    let total = options.inputs().len();

    fan_out(
        options.inputs(),
        options.concurrency(),
        ArtifactRole::Rendered,
        move |input| {
            let output = staging.generate_path("pdf");
            async move {
                debug!(
                    "Rendering '{}' → '{}' ({} input(s))",
                    input.display(),
                    output.display(),
                    total
                );
                renderer
                    .render(input, &output, render_options)
                    .await
                    .map_err(|e| classify_render_error(input, e))?;
                Ok(output)
            }
        },
    )
    .await
}

/// Map a renderer failure to the request-level error.
///
/// Page-range and format problems are the client's; anything else is ours.
pub fn classify_render_error(input: &Path, err: AdapterError) -> ConvertError {
    match err {
        AdapterError::MalformedPageRanges(ranges) => ConvertError::MalformedPageRanges {
            ranges,
            field: "nativePageRanges",
        },
        AdapterError::FormatNotAvailable(format) => ConvertError::UnsupportedFormat {
            format,
            field: "nativePdfFormat",
        },
        source => ConvertError::RenderFailed {
            input: input.to_path_buf(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockDocumentRenderer;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn classification() {
        let input = Path::new("a.docx");
        assert!(matches!(
            classify_render_error(input, AdapterError::MalformedPageRanges("x".into())),
            ConvertError::MalformedPageRanges { .. }
        ));
        assert!(matches!(
            classify_render_error(input, AdapterError::FormatNotAvailable("PDF/UA-1".into())),
            ConvertError::UnsupportedFormat { field: "nativePdfFormat", .. }
        ));
        let err = classify_render_error(
            input,
            AdapterError::CommandFailed {
                program: "soffice".into(),
                code: Some(1),
                stderr: String::new(),
            },
        );
        assert!(matches!(err, ConvertError::RenderFailed { ref input, .. } if input == Path::new("a.docx")));
    }

    /// A renderer whose calls finish in reverse order of submission.
    struct ReverseLatencyRenderer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DocumentRenderer for ReverseLatencyRenderer {
        fn extensions(&self) -> Vec<&'static str> {
            vec![".docx"]
        }

        async fn render(
            &self,
            input: &Path,
            _output: &Path,
            _options: &crate::config::RenderOptions,
        ) -> Result<(), AdapterError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let n: u64 = input
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(50 - n * 10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn slots_follow_input_order_and_concurrency_is_bounded() {
        let staging = Staging::new().unwrap();
        let inputs: Vec<PathBuf> = (0..4).map(|i| PathBuf::from(format!("{i}.docx"))).collect();
        let options = OptionSet::builder()
            .inputs(inputs)
            .concurrency(2)
            .build()
            .unwrap();
        let renderer = ReverseLatencyRenderer {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };

        let rendered = render_all(&renderer, &options, &staging).await.unwrap();
        assert_eq!(rendered.len(), 4);
        assert!(rendered.iter().all(|a| a.role == ArtifactRole::Rendered));
        let unique: std::collections::HashSet<_> = rendered.iter().map(|a| &a.path).collect();
        assert_eq!(unique.len(), 4);
        assert!(renderer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn first_failure_aborts_remaining_work() {
        let staging = Staging::new().unwrap();
        let options = OptionSet::builder()
            .inputs(["ok.docx", "bad.docx", "late.docx"])
            .build()
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut renderer = MockDocumentRenderer::new();
        renderer.expect_render().returning(move |input, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            if input == Path::new("bad.docx") {
                Err(AdapterError::Invalid {
                    path: input.to_path_buf(),
                    detail: "corrupt".into(),
                })
            } else {
                Ok(())
            }
        });

        let err = render_all(&renderer, &options, &staging).await.unwrap_err();
        assert!(matches!(err, ConvertError::RenderFailed { ref input, .. } if input == Path::new("bad.docx")));
        // Sequential by default: the third input is never attempted.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
