/// Load state of something the UI displays.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Resource<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Loading | Self::Failed(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        match self {
            Self::Loading => Resource::Loading,
            Self::Ready(value) => Resource::Ready(f(value)),
            Self::Failed(msg) => Resource::Failed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ready_exposes_value() {
        assert_eq!(Resource::Ready(3).ready(), Some(&3));
        assert_eq!(Resource::<i32>::Loading.ready(), None);
        assert_eq!(Resource::<i32>::Failed("x".into()).ready(), None);
    }

    #[test]
    fn map_keeps_state() {
        assert_eq!(Resource::Ready(2).map(|v| v * 2), Resource::Ready(4));
        assert!(Resource::<i32>::Loading.map(|v| v + 1).is_loading());
        assert_eq!(
            Resource::<i32>::Failed("offline".into()).map(|v| v + 1),
            Resource::Failed("offline".into())
        );
    }
}
