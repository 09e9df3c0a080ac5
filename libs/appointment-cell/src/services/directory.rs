// libs/appointment-cell/src/services/directory.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{AppointmentError, AppointmentType};

/// What booking needs to know about a doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub specialty: Option<String>,
    #[serde(default)]
    pub consultation_fee: f64,
    #[serde(default)]
    pub follow_up_fee: f64,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

impl DoctorProfile {
    pub fn new(id: Uuid, consultation_fee: f64, follow_up_fee: f64) -> Self {
        Self {
            id,
            specialty: None,
            consultation_fee,
            follow_up_fee,
            is_available: true,
        }
    }

    pub fn fee_for(&self, appointment_type: AppointmentType) -> f64 {
        match appointment_type {
            AppointmentType::FollowUp => self.follow_up_fee,
            AppointmentType::Consultation | AppointmentType::Emergency => self.consultation_fee,
        }
    }
}

#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError>;
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, AppointmentError>;
}

/// Directory held in memory.
///
/// A permissive directory treats every id as a known patient or a doctor with
/// zero fees, for running the service without a patient/doctor registry.
#[derive(Default)]
pub struct InMemoryDirectory {
    patients: RwLock<HashSet<Uuid>>,
    doctors: RwLock<HashMap<Uuid, DoctorProfile>>,
    permissive: bool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }

    pub async fn add_patient(&self, patient_id: Uuid) {
        self.patients.write().await.insert(patient_id);
    }

    pub async fn add_doctor(&self, profile: DoctorProfile) {
        self.doctors.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl PatientDirectory for InMemoryDirectory {
    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.permissive || self.patients.read().await.contains(&patient_id))
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDirectory {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, AppointmentError> {
        if let Some(profile) = self.doctors.read().await.get(&doctor_id) {
            return Ok(Some(profile.clone()));
        }
        Ok(self
            .permissive
            .then(|| DoctorProfile::new(doctor_id, 0.0, 0.0)))
    }
}

/// Directory reading the `patients` and `doctors` tables.
pub struct SupabaseDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl PatientDirectory for SupabaseDirectory {
    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id", patient_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        debug!("Patient {} lookup returned {} rows", patient_id, rows.len());
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDirectory {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, AppointmentError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=id,specialty,consultation_fee,follow_up_fee,is_available",
            doctor_id
        );
        let rows: Vec<DoctorProfile> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }
}
