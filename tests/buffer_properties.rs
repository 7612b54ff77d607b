//! Buffer capacity and ordering properties

use proptest::prelude::*;
use std::collections::VecDeque;

use elastic_pool::{Buffer, BufferError, PutStatus};

#[derive(Debug, Clone)]
enum Op {
    Put(u32),
    Get,
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![any::<u32>().prop_map(Op::Put), Just(Op::Get)],
        0..200,
    )
}

proptest! {
    /// A buffer behaves like a bounded VecDeque
    #[test]
    fn prop_buffer_matches_bounded_fifo(capacity in 1usize..16, ops in ops()) {
        let buffer = Buffer::new(capacity).unwrap();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Put(item) => match buffer.put(item).unwrap() {
                    PutStatus::Accepted => {
                        prop_assert!(model.len() < capacity);
                        model.push_back(item);
                    }
                    PutStatus::Full(rejected) => {
                        prop_assert_eq!(rejected, item);
                        prop_assert_eq!(model.len(), capacity);
                    }
                },
                Op::Get => prop_assert_eq!(buffer.get().unwrap(), model.pop_front()),
            }
            prop_assert!(buffer.len() <= capacity);
            prop_assert_eq!(buffer.len(), model.len());
        }
    }

    /// Closing freezes intake but lets queued items drain in order
    #[test]
    fn prop_closed_buffer_drains(items in prop::collection::vec(any::<u32>(), 0..16)) {
        let buffer = Buffer::new(16).unwrap();
        for &item in &items {
            prop_assert!(buffer.put(item).unwrap().is_accepted());
        }

        prop_assert!(buffer.close());
        prop_assert!(!buffer.close());
        prop_assert_eq!(buffer.put(0).unwrap_err(), BufferError::Closed);

        for &item in &items {
            prop_assert_eq!(buffer.get().unwrap(), Some(item));
        }
        prop_assert_eq!(buffer.get().unwrap_err(), BufferError::Closed);
    }
}
