pub mod copywriter;
