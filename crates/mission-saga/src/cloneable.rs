use std::any::Any;

/// Trait for type-erased values that can be cloned.
///
/// Compensation snapshots are stored behind this trait so the snapshot store
/// stays `Clone` without knowing the concrete value types.
pub(crate) trait CloneableAny: Any + Send {
    /// Clone the value into a new boxed trait object.
    fn clone_box(&self) -> Box<dyn CloneableAny>;

    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T> CloneableAny for T
where
    T: Clone + Send + 'static,
{
    fn clone_box(&self) -> Box<dyn CloneableAny> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_box_creates_independent_copy_for_string() {
        let original: Box<dyn CloneableAny> = Box::new(String::from("IN_PROGRESS"));
        let cloned = original.clone_box();

        let original_ref: &dyn CloneableAny = &*original;
        let cloned_ref: &dyn CloneableAny = &*cloned;

        assert_eq!(
            original_ref.as_any().downcast_ref::<String>(),
            Some(&String::from("IN_PROGRESS"))
        );
        assert_eq!(
            cloned_ref.as_any().downcast_ref::<String>(),
            Some(&String::from("IN_PROGRESS"))
        );
    }

    #[test]
    fn as_any_returns_none_for_wrong_type() {
        let boxed: Box<dyn CloneableAny> = Box::new(42_i64);
        let value: &dyn CloneableAny = &*boxed;

        assert!(value.as_any().downcast_ref::<String>().is_none());
        assert_eq!(value.as_any().downcast_ref::<i64>(), Some(&42));
    }
}
