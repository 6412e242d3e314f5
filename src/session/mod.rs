//! Session state machine for conversational grounding.
//!
//! A session is UNGROUNDED until its first successful retrieval-augmented
//! turn anchors a video segment (frame, optionally a clip and a caption);
//! from then on every query goes straight to vision-language inference over
//! the anchored segment. Retrieval is never repeated within a session; only
//! an explicit clear starts over.

use crate::chain::RagChain;
use crate::clip::{extract_clip, ClipRequest};
use crate::config::{ClipSettings, Prompts, Settings};
use crate::conversation::{build_lvlm_conversation, Message};
use crate::error::Result;
use crate::inference::Lvlm;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The artifacts a session is anchored to after its first grounded answer.
///
/// Set exactly once per session and immutable until cleared. The image is
/// the grounding marker; clip and caption are independently optional (a
/// segment may lack a source video or a transcript).
#[derive(Debug, Clone, Default)]
pub struct GroundingContext {
    /// Frame image the session is anchored to.
    pub image_path: Option<PathBuf>,
    /// Extracted clip around the segment midpoint.
    pub video_path: Option<PathBuf>,
    /// Segment transcript used as the caption for follow-up turns.
    pub caption: Option<String>,
}

impl GroundingContext {
    /// Whether the session has been grounded.
    pub fn is_grounded(&self) -> bool {
        self.image_path.is_some()
    }
}

/// Full conversational state of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Ordered message history, append-only between clears.
    pub messages: Vec<Message>,
    /// Anchored artifacts, all-none until grounding.
    pub grounding: GroundingContext,
}

/// One user's conversation with the video corpus.
///
/// Owns the session state and routes each query to either the
/// retrieval-augmented chain (first turn) or direct vision-language
/// inference over the adapted history (follow-ups). Queries are processed
/// strictly sequentially; the engine holds no cross-session state.
pub struct ChatSession {
    chain: RagChain,
    lvlm: Arc<dyn Lvlm>,
    prompts: Prompts,
    clip_settings: ClipSettings,
    clip_output_dir: PathBuf,
    state: SessionState,
}

impl ChatSession {
    /// Create a new ungrounded session.
    pub fn new(chain: RagChain, lvlm: Arc<dyn Lvlm>, prompts: Prompts, settings: &Settings) -> Self {
        Self {
            chain,
            lvlm,
            prompts,
            clip_settings: settings.clip.clone(),
            clip_output_dir: settings.clip_output_dir(),
            state: SessionState::default(),
        }
    }

    /// Override the clip file name, e.g. with a per-session unique name so
    /// parallel sessions do not overwrite each other's clips.
    pub fn with_clip_name(mut self, output_name: impl Into<String>) -> Self {
        self.clip_settings.output_name = output_name.into();
        self
    }

    /// Current session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether the session has been grounded.
    pub fn is_grounded(&self) -> bool {
        self.state.grounding.is_grounded()
    }

    /// Submit one query and return the answer.
    ///
    /// On failure the user message stays in history, no assistant turn is
    /// appended, and grounding is untouched: it is staged locally and only
    /// committed once every fallible step of the turn has succeeded.
    #[instrument(skip(self), fields(query = %query, grounded = self.is_grounded()))]
    pub async fn submit_query(&mut self, query: &str) -> Result<String> {
        self.state.messages.push(Message::user(query));

        let answer = if self.is_grounded() {
            self.continue_conversation().await
        } else {
            self.ground_with_retrieval(query).await
        };

        match answer {
            Ok(answer) => {
                self.state.messages.push(Message::assistant(&answer));
                Ok(answer)
            }
            Err(e) => {
                debug!("Turn failed: {}", e);
                Err(e)
            }
        }
    }

    /// Clear the session: history and grounding return to their initial
    /// empty values and the next query retrieves again.
    pub fn clear(&mut self) {
        self.state = SessionState::default();
        info!("Session cleared");
    }

    /// First turn: retrieve, answer, and anchor the retrieved segment.
    async fn ground_with_retrieval(&mut self, query: &str) -> Result<String> {
        let output = self.chain.invoke(query).await?;
        let metadata = &output.input_to_lvlm.metadata;

        // Stage grounding; committed only after every step succeeded.
        let mut grounding = GroundingContext {
            image_path: Some(output.input_to_lvlm.image.clone()),
            video_path: None,
            caption: metadata.transcript.clone(),
        };

        if let (Some(video_path), Some(mid_time_ms)) = (&metadata.video_path, metadata.mid_time_ms)
        {
            let clip = extract_clip(&ClipRequest {
                source: video_path.clone(),
                timestamp_ms: mid_time_ms,
                lead_seconds: self.clip_settings.lead_seconds,
                trail_seconds: self.clip_settings.trail_seconds,
                output_dir: self.clip_output_dir.clone(),
                output_name: self.clip_settings.output_name.clone(),
            })
            .await?;
            grounding.video_path = Some(clip.output_path);
        }

        self.state.grounding = grounding;
        info!(video_id = %metadata.video_id, "Session grounded");

        Ok(output.final_text_output)
    }

    /// Follow-up turn: adapt the history and infer directly, no retrieval.
    async fn continue_conversation(&self) -> Result<String> {
        let conversation =
            build_lvlm_conversation(&self.state.messages, &self.state.grounding, &self.prompts)?;
        self.lvlm.infer_conversation(&conversation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Role};
    use crate::error::SiktError;
    use crate::inference::Lvlm;
    use crate::retrieval::{Retriever, SegmentHit, SegmentMetadata};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingRetriever {
        hits: Vec<SegmentHit>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Retriever for CountingRetriever {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<SegmentHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.iter().take(k).cloned().collect())
        }
    }

    struct RecordingLvlm {
        answer: String,
        conversations: Mutex<Vec<Conversation>>,
        infer_calls: Arc<AtomicUsize>,
    }

    impl RecordingLvlm {
        fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                conversations: Mutex::new(Vec::new()),
                infer_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl Lvlm for RecordingLvlm {
        async fn infer(&self, _prompt: &str, _image: &Path) -> Result<String> {
            self.infer_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.clone())
        }

        async fn infer_conversation(&self, conversation: &Conversation) -> Result<String> {
            self.infer_calls.fetch_add(1, Ordering::SeqCst);
            self.conversations.lock().unwrap().push(conversation.clone());
            Ok(self.answer.clone())
        }
    }

    fn hit(frame: &str, transcript: Option<&str>) -> SegmentHit {
        SegmentHit {
            content: "segment content".to_string(),
            score: 0.88,
            metadata: SegmentMetadata {
                video_id: "v1".to_string(),
                transcript: transcript.map(|t| t.to_string()),
                frame_path: PathBuf::from(frame),
                // No source video: grounding without clip extraction, so
                // tests run without ffmpeg.
                video_path: None,
                mid_time_ms: None,
            },
        }
    }

    fn session(
        hits: Vec<SegmentHit>,
        answer: &str,
    ) -> (ChatSession, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let retrieval_calls = Arc::new(AtomicUsize::new(0));
        let retriever = Arc::new(CountingRetriever {
            hits,
            calls: retrieval_calls.clone(),
        });
        let lvlm = Arc::new(RecordingLvlm::new(answer));
        let infer_calls = lvlm.infer_calls.clone();

        let chain = RagChain::new(retriever, lvlm.clone(), Prompts::default());
        let session = ChatSession::new(chain, lvlm, Prompts::default(), &Settings::default());
        (session, retrieval_calls, infer_calls)
    }

    #[tokio::test]
    async fn test_first_query_grounds_the_session() {
        let (mut session, retrieval_calls, _) = session(
            vec![hit("/frames/f.jpg", Some("One small step"))],
            "Neil Armstrong",
        );
        assert!(!session.is_grounded());

        let answer = session.submit_query("What is the name of one of the astronauts?").await.unwrap();

        assert_eq!(answer, "Neil Armstrong");
        assert!(session.is_grounded());
        assert_eq!(retrieval_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            session.state().grounding.image_path,
            Some(PathBuf::from("/frames/f.jpg"))
        );
        assert_eq!(
            session.state().grounding.caption.as_deref(),
            Some("One small step")
        );
        assert!(session.state().grounding.video_path.is_none());

        let messages = &session.state().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Neil Armstrong");
    }

    #[tokio::test]
    async fn test_follow_up_skips_retrieval() {
        let (mut session, retrieval_calls, infer_calls) = session(
            vec![hit("/frames/f.jpg", Some("One small step"))],
            "an answer",
        );

        session.submit_query("first question").await.unwrap();
        assert_eq!(infer_calls.load(Ordering::SeqCst), 1);

        session.submit_query("What does he say next?").await.unwrap();

        assert_eq!(retrieval_calls.load(Ordering::SeqCst), 1);
        assert_eq!(infer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.state().messages.len(), 4);
    }

    #[tokio::test]
    async fn test_follow_up_conversation_shape() {
        let retrieval_calls = Arc::new(AtomicUsize::new(0));
        let retriever = Arc::new(CountingRetriever {
            hits: vec![hit("/frames/f.jpg", Some("One small step"))],
            calls: retrieval_calls,
        });
        let lvlm = Arc::new(RecordingLvlm::new("an answer"));

        let chain = RagChain::new(retriever, lvlm.clone(), Prompts::default());
        let mut session =
            ChatSession::new(chain, lvlm.clone(), Prompts::default(), &Settings::default());

        session.submit_query("first question").await.unwrap();
        session.submit_query("What does he say next?").await.unwrap();

        let conversations = lvlm.conversations.lock().unwrap();
        assert_eq!(conversations.len(), 1);

        // 3 turns: grounding exchange plus the new query
        let conv = &conversations[0];
        assert_eq!(conv.len(), 3);
        assert!(conv.turns[0].image.is_some());
        assert!(conv.turns[1].image.is_none());
        assert!(conv.turns[2].image.is_none());
        assert_eq!(
            conv.turns[2].content,
            "The transcript associated with the image is 'One small step'. What does he say next?"
        );
    }

    #[tokio::test]
    async fn test_empty_retrieval_leaves_session_ungrounded() {
        let (mut session, _, infer_calls) = session(Vec::new(), "unused");

        let result = session.submit_query("anything at all").await;

        assert!(matches!(result, Err(SiktError::RetrievalEmpty(_))));
        assert!(!session.is_grounded());
        assert_eq!(infer_calls.load(Ordering::SeqCst), 0);

        // The unanswered user message is the only history
        let messages = &session.state().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "anything at all");
    }

    #[tokio::test]
    async fn test_failed_turn_does_not_partially_ground() {
        struct FailingLvlm;

        #[async_trait]
        impl Lvlm for FailingLvlm {
            async fn infer(&self, _prompt: &str, _image: &Path) -> Result<String> {
                Err(SiktError::Inference("model overloaded".to_string()))
            }

            async fn infer_conversation(&self, _conversation: &Conversation) -> Result<String> {
                Err(SiktError::Inference("model overloaded".to_string()))
            }
        }

        let retriever = Arc::new(CountingRetriever {
            hits: vec![hit("/frames/f.jpg", Some("caption"))],
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let chain = RagChain::new(retriever, Arc::new(FailingLvlm), Prompts::default());
        let mut session =
            ChatSession::new(chain, Arc::new(FailingLvlm), Prompts::default(), &Settings::default());

        let result = session.submit_query("a question").await;

        assert!(matches!(result, Err(SiktError::Inference(_))));
        assert!(!session.is_grounded());
        assert!(session.state().grounding.caption.is_none());
        assert_eq!(session.state().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_to_ungrounded() {
        let (mut session, retrieval_calls, _) = session(
            vec![hit("/frames/f.jpg", Some("caption"))],
            "an answer",
        );

        session.submit_query("first question").await.unwrap();
        assert!(session.is_grounded());

        session.clear();

        assert!(!session.is_grounded());
        assert!(session.state().messages.is_empty());
        assert!(session.state().grounding.image_path.is_none());
        assert!(session.state().grounding.video_path.is_none());
        assert!(session.state().grounding.caption.is_none());

        // Next query retrieves again
        session.submit_query("a fresh question").await.unwrap();
        assert_eq!(retrieval_calls.load(Ordering::SeqCst), 2);
        assert!(session.is_grounded());
    }
}
