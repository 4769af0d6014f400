//! In-process simulated peripheral.
//!
//! A scriptable [`Transport`] implementation exposing the LED + Button
//! service, used by the demo binary and the integration tests. It records
//! every bridge call, can fail scripted operations once, and offers handles
//! to push notifications or drop the connection from the outside.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::{LinkEvent, LinkEvents, Transport};
use crate::error::{Operation, TransportError};
use crate::protocol;

/// One scripted single-shot failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    Initialize,
    Availability,
    RequestDevice,
    Connect,
    PrimaryService,
    Characteristic(Uuid),
    Read,
    Write,
    StartNotifications,
    StopNotifications,
}

/// One recorded bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    Initialize,
    Availability,
    RequestDevice,
    Connect,
    PrimaryService(Uuid),
    Characteristic(Uuid),
    Read(Uuid),
    Write(Uuid, Vec<u8>),
    StartNotifications(Uuid),
    StopNotifications(Uuid),
}

pub struct SimDevice {
    pub name: String,
}

pub struct SimService {
    uuid: Uuid,
}

#[derive(Clone)]
pub struct SimCharacteristic {
    uuid: Uuid,
}

struct Inner {
    name: String,
    service: Uuid,
    characteristics: Vec<Uuid>,
    /// Scripted availability results; once exhausted, always available.
    availability: VecDeque<bool>,
    faults: Vec<SimFault>,
    calls: Vec<SimCall>,
    updates: watch::Sender<usize>,
    events: Option<mpsc::UnboundedSender<LinkEvent>>,
    read_payload: Vec<u8>,
}

/// Clonable handle to one simulated peripheral; clones share state, so a
/// test can keep one side while the controller drives the other.
#[derive(Clone)]
pub struct SimulatedPeripheral {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedPeripheral {
    pub fn new(name: &str) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                name: name.to_string(),
                service: protocol::USER_SERVICE_UUID,
                characteristics: vec![
                    protocol::STATE_CHARACTERISTIC_UUID,
                    protocol::LED_CHARACTERISTIC_UUID,
                    protocol::BUTTON_CHARACTERISTIC_UUID,
                ],
                availability: VecDeque::new(),
                faults: Vec::new(),
                calls: Vec::new(),
                updates,
                events: None,
                read_payload: vec![0u8; 12],
            })),
        }
    }

    /// Queue availability results for the next checks.
    pub fn script_availability(&self, results: impl IntoIterator<Item = bool>) {
        self.inner
            .lock()
            .unwrap()
            .availability
            .extend(results);
    }

    /// Make the named operation fail once.
    pub fn inject(&self, fault: SimFault) {
        self.inner.lock().unwrap().faults.push(fault);
    }

    /// Payload returned by reads of the state characteristic.
    pub fn set_read_payload(&self, payload: Vec<u8>) {
        self.inner.lock().unwrap().read_payload = payload;
    }

    /// Push a value-changed notification to the current connection, if any.
    pub fn push_notification(&self, characteristic: Uuid, value: Vec<u8>) {
        let inner = self.inner.lock().unwrap();
        if let Some(events) = &inner.events {
            let _ = events.send(LinkEvent::Notification {
                characteristic,
                value,
            });
        }
    }

    /// Drop the current connection, as if the peripheral powered off.
    pub fn drop_connection(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(events) = inner.events.take() {
            let _ = events.send(LinkEvent::Disconnected);
        }
    }

    /// Snapshot of every bridge call so far.
    pub fn calls(&self) -> Vec<SimCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Values written to one characteristic, in order.
    pub fn writes(&self, characteristic: Uuid) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SimCall::Write(uuid, value) if uuid == characteristic => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Watch channel bumped after every recorded call; lets tests wait for
    /// the controller to reach a point without sleeping.
    pub fn updates(&self) -> watch::Receiver<usize> {
        self.inner.lock().unwrap().updates.subscribe()
    }

    fn record(&self, call: SimCall) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        let count = inner.calls.len();
        let _ = inner.updates.send(count);
    }

    fn take_fault(&self, fault: SimFault) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if let Some(position) = inner.faults.iter().position(|f| *f == fault) {
            inner.faults.remove(position);
            true
        } else {
            false
        }
    }
}

impl Transport for SimulatedPeripheral {
    type Device = SimDevice;
    type Service = SimService;
    type Characteristic = SimCharacteristic;

    async fn initialize(&mut self) -> Result<(), TransportError> {
        self.record(SimCall::Initialize);
        if self.take_fault(SimFault::Initialize) {
            return Err(TransportError::failure(
                Operation::Initialize,
                "bridge refused to initialize",
            ));
        }
        Ok(())
    }

    async fn availability(&mut self) -> Result<bool, TransportError> {
        self.record(SimCall::Availability);
        if self.take_fault(SimFault::Availability) {
            return Err(TransportError::failure(
                Operation::Availability,
                "bridge error",
            ));
        }
        Ok(self
            .inner
            .lock()
            .unwrap()
            .availability
            .pop_front()
            .unwrap_or(true))
    }

    async fn request_device(&mut self) -> Result<Self::Device, TransportError> {
        self.record(SimCall::RequestDevice);
        if self.take_fault(SimFault::RequestDevice) {
            return Err(TransportError::SelectionCancelled);
        }
        let name = self.inner.lock().unwrap().name.clone();
        Ok(SimDevice { name })
    }

    async fn connect(&mut self, _device: &Self::Device) -> Result<LinkEvents, TransportError> {
        self.record(SimCall::Connect);
        if self.take_fault(SimFault::Connect) {
            return Err(TransportError::failure(Operation::Connect, "GATT refused"));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().events = Some(sender);
        Ok(receiver)
    }

    async fn primary_service(
        &mut self,
        _device: &Self::Device,
        service: Uuid,
    ) -> Result<Self::Service, TransportError> {
        self.record(SimCall::PrimaryService(service));
        let known = self.inner.lock().unwrap().service == service;
        if self.take_fault(SimFault::PrimaryService) || !known {
            return Err(TransportError::failure(
                Operation::GetService,
                format!("no service {service}"),
            ));
        }
        Ok(SimService { uuid: service })
    }

    async fn characteristic(
        &mut self,
        service: &Self::Service,
        characteristic: Uuid,
    ) -> Result<Self::Characteristic, TransportError> {
        self.record(SimCall::Characteristic(characteristic));
        let known = {
            let inner = self.inner.lock().unwrap();
            service.uuid == inner.service && inner.characteristics.contains(&characteristic)
        };
        if self.take_fault(SimFault::Characteristic(characteristic)) || !known {
            return Err(TransportError::failure(
                Operation::GetCharacteristic,
                format!("no characteristic {characteristic}"),
            ));
        }
        Ok(SimCharacteristic {
            uuid: characteristic,
        })
    }

    async fn read(
        &mut self,
        characteristic: &Self::Characteristic,
    ) -> Result<Vec<u8>, TransportError> {
        self.record(SimCall::Read(characteristic.uuid));
        if self.take_fault(SimFault::Read) {
            return Err(TransportError::failure(Operation::Read, "GATT read failed"));
        }
        Ok(self.inner.lock().unwrap().read_payload.clone())
    }

    async fn write(
        &mut self,
        characteristic: &Self::Characteristic,
        value: &[u8],
    ) -> Result<(), TransportError> {
        self.record(SimCall::Write(characteristic.uuid, value.to_vec()));
        if self.take_fault(SimFault::Write) {
            return Err(TransportError::failure(
                Operation::Write,
                "GATT write failed",
            ));
        }
        Ok(())
    }

    async fn start_notifications(
        &mut self,
        characteristic: &Self::Characteristic,
    ) -> Result<(), TransportError> {
        self.record(SimCall::StartNotifications(characteristic.uuid));
        if self.take_fault(SimFault::StartNotifications) {
            return Err(TransportError::failure(
                Operation::StartNotifications,
                "descriptor write failed",
            ));
        }
        Ok(())
    }

    async fn stop_notifications(
        &mut self,
        characteristic: &Self::Characteristic,
    ) -> Result<(), TransportError> {
        self.record(SimCall::StopNotifications(characteristic.uuid));
        if self.take_fault(SimFault::StopNotifications) {
            return Err(TransportError::failure(
                Operation::StopNotifications,
                "descriptor write failed",
            ));
        }
        Ok(())
    }

    fn device_name(&self, device: &Self::Device) -> String {
        device.name.clone()
    }
}
