//! The retrieval-augmented inference chain.
//!
//! Three stages with typed intermediates: retrieve the rank-1 segment for
//! the query, build the grounded prompt from its transcript and frame, and
//! run vision-language inference. The stage-2 output is carried through
//! unchanged alongside the final answer so the caller can anchor the
//! segment the answer was grounded in.

use crate::config::Prompts;
use crate::error::{Result, SiktError};
use crate::inference::Lvlm;
use crate::retrieval::{Retriever, SegmentMetadata};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The structure handed to vision-language inference by stage 2.
#[derive(Debug, Clone)]
pub struct LvlmInput {
    /// The grounded prompt (transcript + user query).
    pub prompt: String,
    /// Frame image the prompt refers to.
    pub image: PathBuf,
    /// Full metadata of the retrieved segment.
    pub metadata: SegmentMetadata,
}

/// Result of a chain invocation.
#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// The generated answer.
    pub final_text_output: String,
    /// The stage-2 output the answer was produced from.
    pub input_to_lvlm: LvlmInput,
}

/// Retrieval-augmented chain over a retriever and a vision-language model.
pub struct RagChain {
    retriever: Arc<dyn Retriever>,
    lvlm: Arc<dyn Lvlm>,
    prompts: Prompts,
}

impl RagChain {
    /// Create a new chain.
    pub fn new(retriever: Arc<dyn Retriever>, lvlm: Arc<dyn Lvlm>, prompts: Prompts) -> Self {
        Self {
            retriever,
            lvlm,
            prompts,
        }
    }

    /// Run the chain for one query.
    ///
    /// Retrieval policy is strict rank-1: no threshold, no fallback to
    /// lower-ranked results, and zero results is a hard error.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn invoke(&self, query: &str) -> Result<ChainOutput> {
        let hits = self.retriever.search(query, 1).await?;

        let top = hits
            .into_iter()
            .next()
            .ok_or_else(|| SiktError::RetrievalEmpty(query.to_string()))?;
        debug!(score = top.score, video_id = %top.metadata.video_id, "Selected rank-1 segment");

        let input = self.build_lvlm_input(top.metadata, query);

        let answer = self.lvlm.infer(&input.prompt, &input.image).await?;
        info!("Generated grounded answer ({} chars)", answer.len());

        Ok(ChainOutput {
            final_text_output: answer,
            input_to_lvlm: input,
        })
    }

    /// Stage 2: fold the segment transcript and the user query into the
    /// grounding template. A segment without a transcript renders an empty
    /// slot rather than failing the turn.
    fn build_lvlm_input(&self, metadata: SegmentMetadata, query: &str) -> LvlmInput {
        let transcript = metadata.transcript.as_deref().unwrap_or("");
        LvlmInput {
            prompt: self.prompts.render_grounding(transcript, query),
            image: metadata.frame_path.clone(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Conversation;
    use crate::retrieval::SegmentHit;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticRetriever {
        hits: Vec<SegmentHit>,
        calls: AtomicUsize,
    }

    impl StaticRetriever {
        fn new(hits: Vec<SegmentHit>) -> Self {
            Self {
                hits,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<SegmentHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.iter().take(k).cloned().collect())
        }
    }

    struct EchoLvlm;

    #[async_trait]
    impl Lvlm for EchoLvlm {
        async fn infer(&self, prompt: &str, _image: &Path) -> Result<String> {
            Ok(format!("echo: {}", prompt))
        }

        async fn infer_conversation(&self, conversation: &Conversation) -> Result<String> {
            Ok(format!("echo turns: {}", conversation.len()))
        }
    }

    fn hit(transcript: Option<&str>) -> SegmentHit {
        SegmentHit {
            content: "An astronaut floats outside the station".to_string(),
            score: 0.91,
            metadata: SegmentMetadata {
                video_id: "v1".to_string(),
                transcript: transcript.map(|t| t.to_string()),
                frame_path: PathBuf::from("/frames/v1_3.jpg"),
                video_path: Some(PathBuf::from("/videos/v1.mp4")),
                mid_time_ms: Some(125_000),
            },
        }
    }

    #[tokio::test]
    async fn test_chain_composes_prompt_and_carries_metadata() {
        let chain = RagChain::new(
            Arc::new(StaticRetriever::new(vec![hit(Some("One small step"))])),
            Arc::new(EchoLvlm),
            Prompts::default(),
        );

        let output = chain.invoke("What does he say?").await.unwrap();

        assert_eq!(
            output.input_to_lvlm.prompt,
            "The transcript associated with the image is 'One small step'. What does he say?"
        );
        assert_eq!(
            output.final_text_output,
            format!("echo: {}", output.input_to_lvlm.prompt)
        );
        assert_eq!(output.input_to_lvlm.image, PathBuf::from("/frames/v1_3.jpg"));
        assert_eq!(output.input_to_lvlm.metadata.mid_time_ms, Some(125_000));
    }

    #[tokio::test]
    async fn test_empty_retrieval_is_a_hard_error() {
        let chain = RagChain::new(
            Arc::new(StaticRetriever::new(Vec::new())),
            Arc::new(EchoLvlm),
            Prompts::default(),
        );

        let result = chain.invoke("anything").await;
        assert!(matches!(result, Err(SiktError::RetrievalEmpty(_))));
    }

    #[tokio::test]
    async fn test_missing_transcript_renders_empty_slot() {
        let chain = RagChain::new(
            Arc::new(StaticRetriever::new(vec![hit(None)])),
            Arc::new(EchoLvlm),
            Prompts::default(),
        );

        let output = chain.invoke("What is shown?").await.unwrap();
        assert_eq!(
            output.input_to_lvlm.prompt,
            "The transcript associated with the image is ''. What is shown?"
        );
    }
}
