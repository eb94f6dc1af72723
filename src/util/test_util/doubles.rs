//! Hand-written sample doubles.
//!
//! These play the role of the external interception facility: each double
//! holds the [`MockRef`] stamped at creation and forwards every method to
//! the dispatch glue with a stable descriptor and the argument array. A
//! proxy generator would emit exactly this shape.

use std::sync::Mutex;

use crate::invocation::MethodDescriptor;
use crate::mock::{glue, Mock, MockDouble, MockRef, SpyDouble};
use crate::values::ArgValue;

pub trait Greeter {
    fn greet(&self, name: &str) -> String;
    fn save(&self, value: &str);
}

pub const GREETER_GREET: MethodDescriptor =
    MethodDescriptor::new("Greeter", "greet", &["String"]);
pub const GREETER_SAVE: MethodDescriptor = MethodDescriptor::new("Greeter", "save", &["String"]);

pub struct GreeterMock {
    mock_ref: MockRef,
}

impl Mock for GreeterMock {
    fn mock_ref(&self) -> &MockRef {
        &self.mock_ref
    }
}

impl MockDouble for GreeterMock {
    fn with_ref(mock_ref: MockRef) -> Self {
        GreeterMock { mock_ref }
    }
}

impl Greeter for GreeterMock {
    fn greet(&self, name: &str) -> String {
        glue::call(
            &self.mock_ref,
            GREETER_GREET,
            vec![ArgValue::of(name.to_owned())],
        )
    }

    fn save(&self, value: &str) {
        glue::call::<()>(
            &self.mock_ref,
            GREETER_SAVE,
            vec![ArgValue::of(value.to_owned())],
        )
    }
}

/// A real `Greeter` used as a spy subject; remembers what it was asked to
/// save.
#[derive(Default)]
pub struct RealGreeter {
    pub saved: Mutex<Vec<String>>,
}

impl Greeter for RealGreeter {
    fn greet(&self, name: &str) -> String {
        format!("hello {}", name)
    }

    fn save(&self, value: &str) {
        self.saved.lock().unwrap().push(value.to_owned());
    }
}

pub struct GreeterSpy {
    mock_ref: MockRef,
    subject: RealGreeter,
}

impl GreeterSpy {
    pub fn subject(&self) -> &RealGreeter {
        &self.subject
    }
}

impl Mock for GreeterSpy {
    fn mock_ref(&self) -> &MockRef {
        &self.mock_ref
    }
}

impl SpyDouble for GreeterSpy {
    type Subject = RealGreeter;

    fn with_parts(mock_ref: MockRef, subject: RealGreeter) -> Self {
        GreeterSpy { mock_ref, subject }
    }
}

impl Greeter for GreeterSpy {
    fn greet(&self, name: &str) -> String {
        glue::spy_call(
            &self.mock_ref,
            GREETER_GREET,
            vec![ArgValue::of(name.to_owned())],
            || self.subject.greet(name),
        )
    }

    fn save(&self, value: &str) {
        glue::spy_call::<()>(
            &self.mock_ref,
            GREETER_SAVE,
            vec![ArgValue::of(value.to_owned())],
            || self.subject.save(value),
        )
    }
}

pub trait Session {
    fn login(&self, user: &str, password: &str) -> bool;
    fn secret(&self) -> String;
    fn logout(&self);
}

pub const SESSION_LOGIN: MethodDescriptor =
    MethodDescriptor::new("Session", "login", &["String", "String"]);
pub const SESSION_SECRET: MethodDescriptor = MethodDescriptor::new("Session", "secret", &[]);
pub const SESSION_LOGOUT: MethodDescriptor = MethodDescriptor::new("Session", "logout", &[]);

pub struct SessionMock {
    mock_ref: MockRef,
}

impl Mock for SessionMock {
    fn mock_ref(&self) -> &MockRef {
        &self.mock_ref
    }
}

impl MockDouble for SessionMock {
    fn with_ref(mock_ref: MockRef) -> Self {
        SessionMock { mock_ref }
    }
}

impl Session for SessionMock {
    fn login(&self, user: &str, password: &str) -> bool {
        glue::call(
            &self.mock_ref,
            SESSION_LOGIN,
            vec![
                ArgValue::of(user.to_owned()),
                ArgValue::of(password.to_owned()),
            ],
        )
    }

    fn secret(&self) -> String {
        glue::call(&self.mock_ref, SESSION_SECRET, Vec::new())
    }

    fn logout(&self) {
        glue::call::<()>(&self.mock_ref, SESSION_LOGOUT, Vec::new())
    }
}

pub trait Inventory {
    fn count(&self, sku: &str) -> u64;
    fn names(&self) -> Vec<String>;
    fn prices(&self) -> std::collections::HashMap<String, u64>;
    fn enabled(&self, sku: &str) -> bool;
    fn discount(&self, sku: &str) -> Option<f64>;
    fn restock(&self, batch: Option<u64>) -> u64;
    fn label(&self) -> String;
}

pub const INVENTORY_COUNT: MethodDescriptor =
    MethodDescriptor::new("Inventory", "count", &["String"]);
pub const INVENTORY_NAMES: MethodDescriptor = MethodDescriptor::new("Inventory", "names", &[]);
pub const INVENTORY_PRICES: MethodDescriptor = MethodDescriptor::new("Inventory", "prices", &[]);
pub const INVENTORY_ENABLED: MethodDescriptor =
    MethodDescriptor::new("Inventory", "enabled", &["String"]);
pub const INVENTORY_DISCOUNT: MethodDescriptor =
    MethodDescriptor::new("Inventory", "discount", &["String"]);
pub const INVENTORY_RESTOCK: MethodDescriptor =
    MethodDescriptor::new("Inventory", "restock", &["Option<u64>"]);
pub const INVENTORY_LABEL: MethodDescriptor = MethodDescriptor::new("Inventory", "label", &[]);

pub struct InventoryMock {
    mock_ref: MockRef,
}

impl Mock for InventoryMock {
    fn mock_ref(&self) -> &MockRef {
        &self.mock_ref
    }
}

impl MockDouble for InventoryMock {
    fn with_ref(mock_ref: MockRef) -> Self {
        InventoryMock { mock_ref }
    }
}

impl Inventory for InventoryMock {
    fn count(&self, sku: &str) -> u64 {
        glue::call(
            &self.mock_ref,
            INVENTORY_COUNT,
            vec![ArgValue::of(sku.to_owned())],
        )
    }

    fn names(&self) -> Vec<String> {
        glue::call(&self.mock_ref, INVENTORY_NAMES, Vec::new())
    }

    fn prices(&self) -> std::collections::HashMap<String, u64> {
        glue::call(&self.mock_ref, INVENTORY_PRICES, Vec::new())
    }

    fn enabled(&self, sku: &str) -> bool {
        glue::call(
            &self.mock_ref,
            INVENTORY_ENABLED,
            vec![ArgValue::of(sku.to_owned())],
        )
    }

    fn discount(&self, sku: &str) -> Option<f64> {
        glue::call(
            &self.mock_ref,
            INVENTORY_DISCOUNT,
            vec![ArgValue::of(sku.to_owned())],
        )
    }

    fn restock(&self, batch: Option<u64>) -> u64 {
        glue::call(
            &self.mock_ref,
            INVENTORY_RESTOCK,
            vec![ArgValue::of(batch)],
        )
    }

    fn label(&self) -> String {
        glue::call(&self.mock_ref, INVENTORY_LABEL, Vec::new())
    }
}

/// Error type of the fallible store double.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreError {
    pub reason: String,
}

impl StoreError {
    pub fn new(reason: impl Into<String>) -> StoreError {
        StoreError {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store error: {}", self.reason)
    }
}

impl std::error::Error for StoreError {}

pub trait KvStore {
    fn put(&self, key: &str, value: u64) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> u64;
}

pub const KVSTORE_PUT: MethodDescriptor =
    MethodDescriptor::new("KvStore", "put", &["String", "u64"]);
pub const KVSTORE_GET: MethodDescriptor = MethodDescriptor::new("KvStore", "get", &["String"]);

pub struct KvStoreMock {
    mock_ref: MockRef,
}

impl Mock for KvStoreMock {
    fn mock_ref(&self) -> &MockRef {
        &self.mock_ref
    }
}

impl MockDouble for KvStoreMock {
    fn with_ref(mock_ref: MockRef) -> Self {
        KvStoreMock { mock_ref }
    }
}

impl KvStore for KvStoreMock {
    fn put(&self, key: &str, value: u64) -> Result<(), StoreError> {
        glue::try_call(
            &self.mock_ref,
            KVSTORE_PUT,
            vec![ArgValue::of(key.to_owned()), ArgValue::of(value)],
        )
    }

    fn get(&self, key: &str) -> u64 {
        glue::call(&self.mock_ref, KVSTORE_GET, vec![ArgValue::of(key.to_owned())])
    }
}
