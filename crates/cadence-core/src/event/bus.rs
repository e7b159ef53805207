// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


/// A generic, thread-safe event channel.
///
/// The bus is generic over the event type `T` so that `cadence-core` stays
/// decoupled from the concrete scheduler events defined in higher-level crates.
/// Every producer gets its own [`flume::Sender`] clone; the owner of the bus
/// keeps the single receiving end.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a new bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized (unbounded).");
        Self { sender, receiver }
    }

    /// Creates a new bus that holds at most `capacity` pending events.
    ///
    /// Publishing into a full bounded bus blocks the producer, so bounded buses
    /// are only appropriate for producers that can tolerate back-pressure.
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        log::debug!("EventBus initialized (capacity {capacity}).");
        Self { sender, receiver }
    }

    /// Sends an event, logging an error if every receiver is gone.
    ///
    /// Returns `false` when the event could not be delivered.
    pub fn publish(&self, event: T) -> bool {
        log::trace!("Publishing an event.");

        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
            return false;
        }
        true
    }

    /// Returns a clone of the sending end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiving end of the channel.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Removes and returns every event that is currently queued, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of queued events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no event is queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;
    use std::{thread, time::Duration};

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Start,
        Tick { timestamp_ms: u64 },
        Stop,
    }

    #[test]
    fn new_bus_is_empty() {
        let bus = EventBus::<TestEvent>::new();
        assert!(bus.is_empty());
        assert_eq!(bus.len(), 0);
        assert_eq!(bus.receiver().try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn events_are_drained_in_arrival_order() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();

        assert!(bus.publish(TestEvent::Start));
        sender
            .send(TestEvent::Tick { timestamp_ms: 16 })
            .expect("Send should succeed");
        assert!(bus.publish(TestEvent::Stop));

        assert_eq!(bus.len(), 3);
        assert_eq!(
            bus.drain(),
            vec![
                TestEvent::Start,
                TestEvent::Tick { timestamp_ms: 16 },
                TestEvent::Stop
            ]
        );
        assert!(bus.is_empty());
    }

    #[test]
    fn send_from_thread() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender
                .send(TestEvent::Tick { timestamp_ms: 33 })
                .expect("Send from thread failed");
        });

        let received = bus
            .receiver()
            .recv_timeout(Duration::from_secs(1))
            .expect("Event from thread should arrive");
        assert_eq!(received, TestEvent::Tick { timestamp_ms: 33 });
        handle.join().expect("Thread join failed");
    }

    #[test]
    fn bounded_bus_rejects_overflow_with_try_send() {
        let bus = EventBus::<TestEvent>::bounded(1);
        let sender = bus.sender();
        sender.try_send(TestEvent::Start).expect("First send fits");
        assert!(sender.try_send(TestEvent::Stop).is_err());
    }

    #[test]
    fn publish_fails_after_bus_drop() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();
        drop(bus);
        assert!(sender.send(TestEvent::Stop).is_err());
    }
}
