// ============================================================
// Layer 3: Forward Mode
// ============================================================
// Train vs. inference, passed down every forward call.
//
// Reference: Rust Book §6 (Enums)

/// Whether a forward pass is part of training or inference.
///
/// Passed explicitly through every `forward` so the output of a pass is a
/// function of its arguments alone. Only dropout looks at it: in
/// [`Mode::Train`] activations are randomly zeroed, in [`Mode::Inference`]
/// dropout is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Train,
    #[default]
    Inference,
}

impl Mode {
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}
