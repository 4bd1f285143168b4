use crate::{wire::CHANNEL_NAME_LEN, RhxError, RhxResult};

/// Нативное имя канала в спайк-чанке: ровно 5 байт ASCII (`A-010`).
///
/// Байты хранятся как пришли; при отображении хвостовые NUL отбрасываются.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelName([u8; CHANNEL_NAME_LEN]);

/// Спайк-чанк в том виде, как он лежит в потоке
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpikeEvent {
    pub magic_number: u32,
    pub channel_name: ChannelName,
    pub timestamp_raw: u32,
    /// 0: в этом чанке спайка нет (заполнитель)
    pub unit_id: u8,
}

/// Обнаруженный спайк, отданный сессией потребителю.
#[derive(Debug, Clone, PartialEq)]
pub struct Spike {
    pub channel_name: ChannelName,
    pub timestamp_raw: u32,
    pub timestamp_secs: f64,
    pub unit_id: u8,
}

impl ChannelName {
    pub fn from_bytes(bytes: [u8; CHANNEL_NAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Имя из строки; короче 5 символов дополняется NUL.
    pub fn new(name: &str) -> RhxResult<Self> {
        if !name.is_ascii() || name.len() > CHANNEL_NAME_LEN {
            return Err(RhxError::Configuration(format!(
                "channel name must be at most {CHANNEL_NAME_LEN} ASCII characters: '{name}'"
            )));
        }

        let mut bytes = [0u8; CHANNEL_NAME_LEN];
        bytes[..name.len()].copy_from_slice(name.as_bytes());

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; CHANNEL_NAME_LEN] {
        &self.0
    }

    /// Имя без хвостовых NUL; не-ASCII байты заменяются на U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |i| i + 1);

        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl SpikeEvent {
    /// `false` для чанков-заполнителей с `unit_id == 0`.
    pub fn is_spike(&self) -> bool {
        self.unit_id != 0
    }

    /// Метка времени в секундах при шаге `timestep`.
    pub fn timestamp_secs(
        &self,
        timestep: f64,
    ) -> f64 {
        crate::wire::raw_to_seconds(self.timestamp_raw as i64, timestep)
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl std::str::FromStr for ChannelName {
    type Err = RhxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
