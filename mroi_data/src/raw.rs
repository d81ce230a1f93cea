use byteorder::{ByteOrder, LittleEndian};
use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use crate::error::DataError;

/// Element types a raw stack can be stored with.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub enum SampleType {
    U8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    pub fn bit_depth(&self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }
}

/// Anything we can accumulate in double precision.
pub trait Sample: Copy + Into<f64> {}

impl<T: Copy + Into<f64>> Sample for T {}

/// A decoded raw stack of shape [frames, raw rows, pixels per line].
#[derive(Clone,Debug,PartialEq)]
pub enum RawStack {
    U8(Array3<u8>),
    U16(Array3<u16>),
    I16(Array3<i16>),
    U32(Array3<u32>),
    I32(Array3<i32>),
    F32(Array3<f32>),
    F64(Array3<f64>),
}

impl RawStack {

    /// Decode a little-endian sample buffer. The caller owns the file access, this only
    /// interprets the bytes.
    pub fn from_le_bytes(bytes:&[u8],sample_type:SampleType,shape:[usize;3]) -> Result<Self,DataError> {
        let n_samples = shape[0]*shape[1]*shape[2];
        let expected = n_samples*sample_type.bit_depth();
        if bytes.len() != expected {
            return Err(DataError::ByteCount {expected,actual:bytes.len(),shape});
        }
        let dims = (shape[0],shape[1],shape[2]);
        Ok(match sample_type {
            SampleType::U8 => RawStack::U8(Array3::from_shape_vec(dims,bytes.to_vec())?),
            SampleType::U16 => {
                let mut buf = vec![0u16;n_samples];
                LittleEndian::read_u16_into(bytes,&mut buf);
                RawStack::U16(Array3::from_shape_vec(dims,buf)?)
            }
            SampleType::I16 => {
                let mut buf = vec![0i16;n_samples];
                LittleEndian::read_i16_into(bytes,&mut buf);
                RawStack::I16(Array3::from_shape_vec(dims,buf)?)
            }
            SampleType::U32 => {
                let mut buf = vec![0u32;n_samples];
                LittleEndian::read_u32_into(bytes,&mut buf);
                RawStack::U32(Array3::from_shape_vec(dims,buf)?)
            }
            SampleType::I32 => {
                let mut buf = vec![0i32;n_samples];
                LittleEndian::read_i32_into(bytes,&mut buf);
                RawStack::I32(Array3::from_shape_vec(dims,buf)?)
            }
            SampleType::F32 => {
                let mut buf = vec![0f32;n_samples];
                LittleEndian::read_f32_into(bytes,&mut buf);
                RawStack::F32(Array3::from_shape_vec(dims,buf)?)
            }
            SampleType::F64 => {
                let mut buf = vec![0f64;n_samples];
                LittleEndian::read_f64_into(bytes,&mut buf);
                RawStack::F64(Array3::from_shape_vec(dims,buf)?)
            }
        })
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            RawStack::U8(_) => SampleType::U8,
            RawStack::U16(_) => SampleType::U16,
            RawStack::I16(_) => SampleType::I16,
            RawStack::U32(_) => SampleType::U32,
            RawStack::I32(_) => SampleType::I32,
            RawStack::F32(_) => SampleType::F32,
            RawStack::F64(_) => SampleType::F64,
        }
    }

    pub fn shape(&self) -> [usize;3] {
        let s = match self {
            RawStack::U8(a) => a.shape(),
            RawStack::U16(a) => a.shape(),
            RawStack::I16(a) => a.shape(),
            RawStack::U32(a) => a.shape(),
            RawStack::I32(a) => a.shape(),
            RawStack::F32(a) => a.shape(),
            RawStack::F64(a) => a.shape(),
        };
        [s[0],s[1],s[2]]
    }

    /// Hands a typed view of the samples to `op`, whatever the storage type.
    pub fn with_view<R,V:RawVisitor<Output=R>>(&self,op:V) -> R {
        match self {
            RawStack::U8(a) => op.visit(a.view()),
            RawStack::U16(a) => op.visit(a.view()),
            RawStack::I16(a) => op.visit(a.view()),
            RawStack::U32(a) => op.visit(a.view()),
            RawStack::I32(a) => op.visit(a.view()),
            RawStack::F32(a) => op.visit(a.view()),
            RawStack::F64(a) => op.visit(a.view()),
        }
    }
}

/// Generic operation over a raw stack view, see [`RawStack::with_view`].
pub trait RawVisitor {
    type Output;
    fn visit<T:Sample>(self,raw:ArrayView3<T>) -> Self::Output;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FirstSample;

    impl RawVisitor for FirstSample {
        type Output = f64;
        fn visit<T:Sample>(self,raw:ArrayView3<T>) -> f64 {
            raw[[0,0,0]].into()
        }
    }

    #[test]
    fn decodes_u16(){
        let samples:[u16;6] = [1,2,3,4,5,65535];
        let mut bytes = vec![0u8;12];
        LittleEndian::write_u16_into(&samples,&mut bytes);
        let raw = RawStack::from_le_bytes(&bytes,SampleType::U16,[1,2,3]).unwrap();
        assert_eq!(raw.sample_type(),SampleType::U16);
        assert_eq!(raw.shape(),[1,2,3]);
        match &raw {
            RawStack::U16(a) => {
                assert_eq!(a[[0,1,0]],4);
                assert_eq!(a[[0,1,2]],65535);
            }
            _ => panic!("wrong variant")
        }
        assert_eq!(raw.with_view(FirstSample),1.0);
    }

    #[test]
    fn decodes_f32_and_i16(){
        let floats:[f32;2] = [1.5,-2.25];
        let mut bytes = vec![0u8;8];
        LittleEndian::write_f32_into(&floats,&mut bytes);
        let raw = RawStack::from_le_bytes(&bytes,SampleType::F32,[2,1,1]).unwrap();
        assert_eq!(raw.with_view(FirstSample),1.5);

        let ints:[i16;2] = [-7,7];
        let mut bytes = vec![0u8;4];
        LittleEndian::write_i16_into(&ints,&mut bytes);
        let raw = RawStack::from_le_bytes(&bytes,SampleType::I16,[1,1,2]).unwrap();
        assert_eq!(raw.with_view(FirstSample),-7.0);
    }

    #[test]
    fn wrong_byte_count(){
        let bytes = vec![0u8;7];
        let err = RawStack::from_le_bytes(&bytes,SampleType::U16,[1,2,2]).unwrap_err();
        match err {
            DataError::ByteCount {expected,actual,..} => {
                assert_eq!(expected,8);
                assert_eq!(actual,7);
            }
            other => panic!("unexpected error {other}")
        }
    }
}
