use crate::state::{Message, Sender};

/// Placeholder shown while the transcript has no real messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Welcome {
    /// Fresh chat prompt.
    NewChat,
    /// Assistant greeting shown once the active conversation is deleted.
    Greeting,
}

impl Welcome {
    pub fn text(&self) -> &'static str {
        match self {
            Welcome::NewChat => "¿Cómo puedo ayudarte hoy?",
            Welcome::Greeting => "¡Hola! Soy tu asistente virtual IA. ¿En qué puedo ayudarte?",
        }
    }

    /// Sender the placeholder is drawn as, if any.
    pub fn sender(&self) -> Option<Sender> {
        match self {
            Welcome::NewChat => None,
            Welcome::Greeting => Some(Sender::Assistant),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Inserted with an entrance transition that hasn't run yet.
    Entering,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub message: Message,
    pub phase: Phase,
}

/// The ordered, scrollable list of messages for the active conversation.
///
/// Entrance transitions are scheduled, not awaited: an animated insert
/// starts in [`Phase::Entering`] and the next [`Transcript::tick`] makes it
/// visible.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<RenderedMessage>,
    welcome: Option<Welcome>,
    scroll_to_end: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            welcome: Some(Welcome::NewChat),
            scroll_to_end: false,
        }
    }

    pub fn entries(&self) -> &[RenderedMessage] {
        &self.entries
    }

    pub fn welcome(&self) -> Option<Welcome> {
        self.welcome
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a message, dropping any placeholder first.
    pub fn render(&mut self, message: Message, animate: bool) {
        self.welcome = None;
        let phase = if animate { Phase::Entering } else { Phase::Visible };
        self.entries.push(RenderedMessage { message, phase });
        self.scroll_to_end = true;
    }

    /// Swap in a whole conversation without transitions.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.entries.clear();
        self.welcome = None;
        for message in messages {
            self.render(message, false);
        }
        self.scroll_to_end = true;
    }

    pub fn clear_and_show_welcome(&mut self, welcome: Welcome) {
        self.entries.clear();
        self.welcome = Some(welcome);
        self.scroll_to_end = false;
    }

    /// Run pending entrance transitions. Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        for entry in self.entries.iter_mut().filter(|e| e.phase == Phase::Entering) {
            entry.phase = Phase::Visible;
            changed = true;
        }
        changed
    }

    /// Consume the pending scroll-to-end request.
    pub fn take_scroll_to_end(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_end)
    }
}
