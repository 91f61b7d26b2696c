/// Movie position stored inside an emulator savestate.
#[cfg_attr(
    feature = "savestate-serde",
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieState {
    pub project_id: String,
    pub current_frame: u64,
    pub lag_frames: u64,
    /// Poll counter save block, see [`PollCounters::save_state`](crate::poll::PollCounters::save_state).
    pub poll_counters: Vec<u32>,
}

#[cfg(feature = "savestate-postcard")]
impl MovieState {
    pub fn to_postcard_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(postcard::to_stdvec(self)?)
    }

    pub fn from_postcard_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

#[cfg(all(test, feature = "savestate-postcard"))]
mod tests {
    use super::*;
    use crate::poll::POLL_SAVE_WORDS;

    #[test]
    fn savestate_postcard_roundtrip() {
        let mut poll_counters = vec![0; POLL_SAVE_WORDS];
        poll_counters[0] = 0x8000_0000;
        poll_counters[7] = 3;
        let state = MovieState {
            project_id: "0123456789abcdef0123456789abcdef01234567".to_string(),
            current_frame: 600,
            lag_frames: 12,
            poll_counters,
        };
        let bytes = state.to_postcard_bytes().expect("encode movie state");
        let decoded = MovieState::from_postcard_bytes(&bytes).expect("decode movie state");
        assert_eq!(decoded, state);
        assert!(matches!(
            MovieState::from_postcard_bytes(&bytes[..bytes.len() / 2]),
            Err(crate::Error::Postcard(_))
        ));
    }
}
