// Channels - Single-producer single-consumer ring buffers
//
// Commands flow UI → audio, notifications flow audio → UI. Neither side
// ever blocks: a full buffer rejects the push and the caller decides.

use crate::messaging::command::Command;
use crate::messaging::notification::Notification;
use ringbuf::{HeapRb, traits::Split};

pub const DEFAULT_COMMAND_CAPACITY: usize = 256;
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;

pub type CommandProducer = ringbuf::HeapProd<Command>;
pub type CommandConsumer = ringbuf::HeapCons<Command>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<Command>::new(capacity.max(1));
    rb.split()
}

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity.max(1));
    rb.split()
}
