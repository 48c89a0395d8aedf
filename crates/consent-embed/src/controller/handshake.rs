use std::rc::Rc;

use consent_common::EmbedError;
use futures_util::future::{self, Either, FutureExt};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::frame::{build_frame_url, FrameParams, FrameSpec};
use crate::host::{EmbedHost, FrameId};

use super::{EmbedController, Frame, Handshake, HandshakeFuture, Inner};

impl<H: EmbedHost> EmbedController<H> {
    /// Create the iframe (once), attach the relay listener (once), and wait
    /// for the widget's `initialized` message.
    ///
    /// Concurrent calls share one handshake. After success every call
    /// returns at once; after a timeout or load failure every call returns
    /// the same error without touching the page again.
    pub async fn init(&self) -> Result<Self, EmbedError> {
        let pending = {
            let state = self.inner.state.borrow();
            match &state.handshake {
                Handshake::Initialized => return Ok(self.clone()),
                Handshake::Failed(err) => return Err(err.clone()),
                Handshake::Pending(handshake) => Some(handshake.clone()),
                Handshake::Idle => None,
            }
        };

        let handshake = match pending {
            Some(handshake) => handshake,
            None => self.start_handshake(),
        };
        handshake.await?;
        Ok(self.clone())
    }

    fn start_handshake(&self) -> HandshakeFuture {
        let inner = &self.inner;

        let frame = match inner.ensure_frame() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "cookie banner iframe could not be created");
                inner.report(err.clone());
                inner.state.borrow_mut().handshake = Handshake::Failed(err.clone());
                return future::ready(Err(err)).boxed_local().shared();
            }
        };
        self.ensure_listener();

        let (reply_tx, reply_rx) = oneshot::channel();
        let timeout = inner.policy.timeout;
        let timer = inner.host.sleep(timeout);
        let weak = Rc::downgrade(inner);

        debug!(
            frame = %frame,
            timeout_ms = timeout.as_millis() as u64,
            "waiting for cookie banner handshake"
        );

        let handshake = async move {
            let outcome = match future::select(reply_rx, timer).await {
                Either::Left((Ok(reply), _)) => reply,
                Either::Left((Err(_), _)) => Err(EmbedError::FrameUnavailable),
                Either::Right(((), _)) => Err(EmbedError::InitializationTimeout(timeout)),
            };
            if let Some(inner) = weak.upgrade() {
                inner.settle_handshake(&outcome);
            }
            outcome
        }
        .boxed_local()
        .shared();

        let mut state = inner.state.borrow_mut();
        state.pending_reply = Some(reply_tx);
        state.handshake = Handshake::Pending(handshake.clone());
        handshake
    }

    /// Subscribe the relay for the lifetime of the page. The listener holds
    /// only a weak reference, so a dropped controller goes quiet.
    fn ensure_listener(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.listening {
                return;
            }
            state.listening = true;
        }

        let weak = Rc::downgrade(&self.inner);
        self.inner.host.subscribe(Rc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(event);
            }
        }));
    }
}

impl<H: EmbedHost> Inner<H> {
    fn ensure_frame(&self) -> Result<FrameId, EmbedError> {
        if let Some(frame) = self.frame_id() {
            return Ok(frame);
        }

        let url = build_frame_url(
            self.options.frame_host(),
            &self.policy.host_origin,
            FrameParams {
                client_id: &self.client_id,
                domain: &self.policy.domain,
                endpoint: self.options.api_endpoint.as_deref(),
            },
        )?;
        let spec = FrameSpec::new(url.clone(), self.options.sandbox.as_str());
        let id = self.host.create_frame(&spec)?;

        debug!(frame = %id, url = %url, "cookie banner iframe created");
        self.state.borrow_mut().frame = Some(Frame {
            id,
            url,
            style: spec.style,
        });
        Ok(id)
    }

    /// Resolve the pending handshake with `outcome`, if it is still pending.
    pub(super) fn complete_handshake(&self, outcome: Result<(), EmbedError>) -> bool {
        let reply = self.state.borrow_mut().pending_reply.take();
        match reply {
            Some(reply) => reply.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Record that the widget answered. Also recovers a handshake that
    /// already timed out.
    pub(super) fn mark_initialized(&self) {
        let recovered = {
            let mut state = self.state.borrow_mut();
            let recovered = matches!(state.handshake, Handshake::Failed(_));
            state.handshake = Handshake::Initialized;
            recovered
        };
        if recovered {
            info!("cookie banner initialized after the handshake had failed");
        }
        self.complete_handshake(Ok(()));
    }

    fn settle_handshake(&self, outcome: &Result<(), EmbedError>) {
        let mut state = self.state.borrow_mut();
        state.pending_reply = None;
        match outcome {
            Ok(()) => {
                state.handshake = Handshake::Initialized;
                info!(client_id = %self.client_id, "cookie banner initialized");
            }
            Err(err) => {
                if !matches!(state.handshake, Handshake::Initialized) {
                    state.handshake = Handshake::Failed(err.clone());
                }
                warn!(error = %err, "cookie banner handshake failed");
            }
        }
    }
}
