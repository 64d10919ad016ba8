pub mod health_handlers;
pub mod lecture_handlers;
pub mod student_handlers;
pub mod teacher_handlers;
