//! Directorio CRM mínimo que el workflow de reservas necesita tocar:
//! clientes, proyectos y citas. Las operaciones de borrado existen sólo para
//! la compensación.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crm_core::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id:         Uuid,
    pub email:      String,
    pub first_name: String,
    pub last_name:  String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id:           Uuid,
    pub customer_id:  Uuid,
    pub order_number: String,
    pub access_code:  String,
    pub notes:        String,
    pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id:         Uuid,
    pub project_id: Uuid,
    pub title:      String,
    pub start_time: String,
    pub end_time:   String,
    pub location:   Option<String>,
    pub created_at: DateTime<Utc>,
}

pub trait CrmDirectory: Send + Sync {
    fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError>;
    fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError>;
    fn delete_customer(&self, id: Uuid) -> Result<(), StoreError>;
    fn insert_project(&self, project: &Project) -> Result<(), StoreError>;
    fn delete_project(&self, id: Uuid) -> Result<(), StoreError>;
    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
}

/// Implementación en memoria sobre `DashMap`, para tests y el binario demo.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    customers:    DashMap<Uuid, Customer>,
    projects:     DashMap<Uuid, Project>,
    appointments: DashMap<Uuid, Appointment>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn appointment_count(&self) -> usize {
        self.appointments.len()
    }

    pub fn project_by_order_number(&self, order_number: &str) -> Option<Project> {
        self.projects
            .iter()
            .find(|p| p.order_number == order_number)
            .map(|p| p.clone())
    }
}

impl CrmDirectory for InMemoryDirectory {
    fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
        let needle = email.to_ascii_lowercase();
        Ok(self.customers
               .iter()
               .find(|c| c.email.eq_ignore_ascii_case(&needle))
               .map(|c| c.clone()))
    }

    fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        self.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    fn delete_customer(&self, id: Uuid) -> Result<(), StoreError> {
        self.customers.remove(&id);
        Ok(())
    }

    fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        self.projects.insert(project.id, project.clone());
        Ok(())
    }

    fn delete_project(&self, id: Uuid) -> Result<(), StoreError> {
        self.projects.remove(&id);
        Ok(())
    }

    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }
}
